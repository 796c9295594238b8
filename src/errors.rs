use std::error::Error;
use std::fmt;
use std::io;
use std::time::Duration;

/// Enumeration of all possible errors that can occur while resolving a duration
#[derive(Debug)]
pub enum DurationError {
    Parse(ParseError),
    Probe(ProbeError),
    Remote(RemoteError),
    Stream(StreamError),
    Queue(QueueError),
    Config(ConfigError),
    /// Every configured tier failed. Holds one `tier: reason` line per attempt.
    Exhausted { attempts: Vec<String> },
    Other(io::Error),
}

/// Box traversal errors. None of these are fatal to a resolution: they end
/// the current traversal level or branch and let the next tier run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The source ended before `requested` bytes could be read at `offset`.
    ShortRead {
        offset: u64,
        requested: u64,
        available: u64,
    },
    /// A box declared a size that cannot hold its own header or overruns its parent.
    MalformedBox { offset: u64, size: u64 },
    /// No duration-bearing header was located within the attempt budget.
    NotFound,
}

/// Playback probe errors
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeError {
    /// The probe did not settle within the configured bound.
    Timeout(Duration),
    /// The decoding engine rejected the input.
    FormatRejected(String),
    /// The engine could not be started or produced unusable output.
    Engine(String),
}

/// Remote fallback errors
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteError {
    Unavailable(String),
    Unparseable(String),
}

#[derive(Debug)]
pub struct StreamError {
    pub message: String,
}

impl StreamError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Batch queue errors
#[derive(Debug)]
pub struct QueueError {
    pub message: String,
}

impl QueueError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationError::Parse(err) => write!(f, "Parse error: {}", err),
            DurationError::Probe(err) => write!(f, "Probe error: {}", err),
            DurationError::Remote(err) => write!(f, "Remote error: {}", err),
            DurationError::Stream(err) => write!(f, "Stream error: {}", err),
            DurationError::Queue(err) => write!(f, "Queue error: {}", err),
            DurationError::Config(err) => write!(f, "Config error: {}", err),
            DurationError::Exhausted { attempts } => {
                write!(f, "All duration tiers failed")?;
                if !attempts.is_empty() {
                    write!(f, " ({})", attempts.join("; "))?;
                }
                Ok(())
            }
            DurationError::Other(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::ShortRead {
                offset,
                requested,
                available,
            } => write!(
                f,
                "short read at offset {}: requested {} bytes, {} available",
                offset, requested, available
            ),
            ParseError::MalformedBox { offset, size } => {
                write!(f, "malformed box at offset {} (declared size {})", offset, size)
            }
            ParseError::NotFound => write!(f, "no duration header found"),
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Timeout(after) => {
                write!(f, "probe did not settle within {} ms", after.as_millis())
            }
            ProbeError::FormatRejected(reason) => write!(f, "format rejected: {}", reason),
            ProbeError::Engine(reason) => write!(f, "engine failure: {}", reason),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Unavailable(reason) => write!(f, "remote unavailable: {}", reason),
            RemoteError::Unparseable(reply) => write!(f, "unparseable reply: {:?}", reply),
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for DurationError {}
impl Error for ParseError {}
impl Error for ProbeError {}
impl Error for RemoteError {}
impl Error for StreamError {}
impl Error for QueueError {}
impl Error for ConfigError {}

// Conversion implementations
impl From<io::Error> for DurationError {
    fn from(err: io::Error) -> Self {
        DurationError::Other(err)
    }
}

impl From<ParseError> for DurationError {
    fn from(err: ParseError) -> Self {
        DurationError::Parse(err)
    }
}

impl From<ProbeError> for DurationError {
    fn from(err: ProbeError) -> Self {
        DurationError::Probe(err)
    }
}

impl From<RemoteError> for DurationError {
    fn from(err: RemoteError) -> Self {
        DurationError::Remote(err)
    }
}

impl From<StreamError> for DurationError {
    fn from(err: StreamError) -> Self {
        DurationError::Stream(err)
    }
}

impl From<QueueError> for DurationError {
    fn from(err: QueueError) -> Self {
        DurationError::Queue(err)
    }
}

impl From<ConfigError> for DurationError {
    fn from(err: ConfigError) -> Self {
        DurationError::Config(err)
    }
}

// Conversion to io::Error for callers working in io::Result
impl From<DurationError> for io::Error {
    fn from(err: DurationError) -> Self {
        io::Error::other(err)
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        io::Error::other(err)
    }
}

// Type alias for Result with DurationError
pub type MediaResult<T> = Result<T, DurationError>;
