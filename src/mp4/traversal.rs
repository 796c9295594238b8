use super::atom_reader::AtomReader;
use super::fields::MediaHeaderFields;
use super::ftyp::{detect_format, ContainerFormat};
use super::hdlr::parse_handler_type;
use super::mdhd::{extract_language_from_mdhd, parse_mdhd};
use super::mvhd::parse_mvhd;
use super::r#box::{read_box_header, BoxHeader};
use crate::config::ScanConfig;
use crate::errors::{MediaResult, ParseError};
use crate::streams::SeekableStream;
use log::{debug, trace};
use serde::Serialize;

/// Upper bound on `moov` tag candidates tried inside the end window.
const MAX_END_CANDIDATES: usize = 16;

/// Which header the duration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeaderKind {
    /// Whole-movie header (`moov/mvhd`)
    Movie,
    /// Per-track media header (`moov/trak/mdia/mdhd`)
    Track,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanWindow {
    Start,
    End,
}

/// The header chosen to report the duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationHeader {
    pub kind: HeaderKind,
    pub fields: MediaHeaderFields,
    pub seconds: f64,
    /// Position among the tracks seen, in file order.
    pub track_index: Option<usize>,
    pub handler: Option<String>,
    pub language: Option<String>,
    /// Source offset of the header box.
    pub offset: u64,
}

/// Outcome of a successful binary scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxScan {
    pub header: DurationHeader,
    pub window: ScanWindow,
    pub format: ContainerFormat,
    /// Box headers decoded by the traversal that found the header.
    pub header_reads: usize,
}

impl BoxScan {
    pub fn seconds(&self) -> f64 {
        self.header.seconds
    }
}

#[derive(Debug, Default)]
struct TrackCandidate {
    fields: Option<(MediaHeaderFields, u64)>,
    handler: Option<[u8; 4]>,
    language: Option<String>,
}

impl TrackCandidate {
    fn usable(&self) -> Option<(MediaHeaderFields, u64, f64)> {
        let (fields, offset) = self.fields?;
        let seconds = usable_seconds(&fields)?;
        Some((fields, offset, seconds))
    }

    fn is_video(&self) -> bool {
        self.handler.as_ref() == Some(b"vide")
    }
}

fn usable_seconds(fields: &MediaHeaderFields) -> Option<f64> {
    fields
        .duration_seconds()
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
}

/// One traversal of a window from a given start offset.
struct Traversal<'c> {
    config: &'c ScanConfig,
    movie: Option<(MediaHeaderFields, u64)>,
    tracks: Vec<TrackCandidate>,
    header_reads: usize,
    done: bool,
}

impl<'c> Traversal<'c> {
    fn new(config: &'c ScanConfig) -> Self {
        Self {
            config,
            movie: None,
            tracks: Vec::new(),
            header_reads: 0,
            done: false,
        }
    }

    /// Walk one level `[start, end)`. An error ends this level only; the
    /// caller carries on with its own siblings.
    fn walk(
        &mut self,
        reader: &AtomReader<'_>,
        start: u64,
        end: u64,
        depth: usize,
        parent: Option<[u8; 4]>,
        track: Option<usize>,
    ) -> Result<(), ParseError> {
        let budget = if depth == 0 {
            self.config.top_level_attempts
        } else {
            self.config.nested_attempts
        };
        let mut offset = start;
        let mut attempts = 0usize;

        while offset < end && !self.done {
            if attempts == budget {
                debug!(
                    "attempt budget of {} exhausted at depth {} (offset {})",
                    budget,
                    depth,
                    reader.base() + offset
                );
                break;
            }
            attempts += 1;
            self.header_reads += 1;

            let header = read_box_header(reader, offset, end)?;
            let mut box_end = header.end();
            if box_end > end {
                // Overrunning the fetched window is truncation, overrunning a
                // parent box is corruption.
                if end < reader.len() {
                    return Err(ParseError::MalformedBox {
                        offset: reader.base() + offset,
                        size: header.size,
                    });
                }
                box_end = end;
            }
            trace!(
                "{:indent$}{} @ {} size {}",
                "",
                header.name(),
                reader.base() + offset,
                header.size,
                indent = depth * 2
            );

            self.visit(reader, &header, box_end, depth, parent, track);
            offset = box_end;
        }
        Ok(())
    }

    fn visit(
        &mut self,
        reader: &AtomReader<'_>,
        header: &BoxHeader,
        box_end: u64,
        depth: usize,
        parent: Option<[u8; 4]>,
        track: Option<usize>,
    ) {
        let payload_start = header.payload_start();
        let result = match (parent.as_ref(), &header.box_type) {
            (None, b"moov") | (Some(b"trak"), b"mdia") => {
                self.enter(reader, header, box_end, depth, track)
            }
            (Some(b"moov"), b"trak") => {
                self.tracks.push(TrackCandidate::default());
                let index = self.tracks.len() - 1;
                self.enter(reader, header, box_end, depth, Some(index))
            }
            (Some(b"moov"), b"mvhd") if self.movie.is_none() => {
                read_payload(reader, payload_start, box_end).map(|payload| {
                    self.movie = parse_mvhd(payload).map(|f| (f, reader.base() + header.offset));
                })
            }
            (Some(b"mdia"), b"mdhd") => match track {
                Some(index) => read_payload(reader, payload_start, box_end).map(|payload| {
                    let candidate = &mut self.tracks[index];
                    if candidate.fields.is_none() {
                        candidate.fields =
                            parse_mdhd(payload).map(|f| (f, reader.base() + header.offset));
                        candidate.language = extract_language_from_mdhd(payload);
                    }
                }),
                None => Ok(()),
            },
            (Some(b"mdia"), b"hdlr") => match track {
                Some(index) => read_payload(reader, payload_start, box_end).map(|payload| {
                    self.tracks[index].handler = parse_handler_type(payload);
                }),
                None => Ok(()),
            },
            _ => Ok(()),
        };

        if let Err(e) = result {
            debug!("skipping {} at {}: {}", header.name(), reader.base() + header.offset, e);
        }

        if let Some(index) = track {
            let candidate = &self.tracks[index];
            if candidate.is_video() && candidate.usable().is_some() {
                self.done = true;
            }
        }
    }

    fn enter(
        &mut self,
        reader: &AtomReader<'_>,
        header: &BoxHeader,
        box_end: u64,
        depth: usize,
        track: Option<usize>,
    ) -> Result<(), ParseError> {
        if depth + 1 > self.config.max_depth {
            debug!("not entering {}: depth limit {}", header.name(), self.config.max_depth);
            return Ok(());
        }
        self.walk(
            reader,
            header.payload_start(),
            box_end,
            depth + 1,
            Some(header.box_type),
            track,
        )
    }

    /// First video track, else first track, else the movie header.
    fn best(&self) -> Option<DurationHeader> {
        let pick = self
            .tracks
            .iter()
            .enumerate()
            .find(|(_, t)| t.is_video() && t.usable().is_some())
            .or_else(|| self.tracks.iter().enumerate().find(|(_, t)| t.usable().is_some()));

        if let Some((index, candidate)) = pick {
            let (fields, offset, seconds) = candidate.usable()?;
            return Some(DurationHeader {
                kind: HeaderKind::Track,
                fields,
                seconds,
                track_index: Some(index),
                handler: candidate
                    .handler
                    .map(|h| String::from_utf8_lossy(&h).into_owned()),
                language: candidate.language.clone(),
                offset,
            });
        }

        let (fields, offset) = self.movie?;
        Some(DurationHeader {
            kind: HeaderKind::Movie,
            fields,
            seconds: usable_seconds(&fields)?,
            track_index: None,
            handler: None,
            language: None,
            offset,
        })
    }
}

fn read_payload<'a>(
    reader: &AtomReader<'a>,
    payload_start: u64,
    box_end: u64,
) -> Result<&'a [u8], ParseError> {
    reader.read_range(payload_start, box_end.saturating_sub(payload_start))
}

/// Traverse a fetched window from each start offset in turn and return the
/// first duration header found, with the number of headers read to find it.
pub fn scan_window(
    data: &[u8],
    base: u64,
    starts: &[u64],
    config: &ScanConfig,
) -> Option<(DurationHeader, usize)> {
    let reader = AtomReader::new(data, base);
    for &start in starts {
        let mut traversal = Traversal::new(config);
        if let Err(e) = traversal.walk(&reader, start, reader.len(), 0, None, None) {
            debug!("top level traversal from {} stopped: {}", base + start, e);
        }
        if let Some(header) = traversal.best() {
            return Some((header, traversal.header_reads));
        }
    }
    None
}

/// Locate the duration header of a box-structured source.
///
/// The first `start_window` bytes are traversed first. Only if that fails is
/// the last `end_window` bytes fetched, for files whose movie box sits at the
/// end. Neither pass loads more than its window.
pub async fn find_duration<S: SeekableStream + ?Sized>(
    source: &S,
    config: &ScanConfig,
) -> MediaResult<BoxScan> {
    let total = source.len();
    if total < 8 {
        return Err(ParseError::NotFound.into());
    }

    let head = source.read_clamped(0, config.start_window).await?;
    let format = detect_format(&head);
    if !format.is_box_structured() {
        debug!("{} source has no box structure", format.name());
        return Err(ParseError::NotFound.into());
    }

    if let Some((header, header_reads)) = scan_window(&head, 0, &[0], config) {
        return Ok(BoxScan {
            header,
            window: ScanWindow::Start,
            format,
            header_reads,
        });
    }
    debug!("no duration header in the first {} bytes", head.len());

    if total <= head.len() as u64 {
        return Err(ParseError::NotFound.into());
    }

    let base = total.saturating_sub(config.end_window as u64);
    let tail = source.read_range(base, (total - base) as usize).await?;
    let starts: Vec<u64> = if base == 0 {
        vec![0]
    } else {
        // The window rarely starts on a box boundary; align on movie boxes.
        AtomReader::new(&tail, base)
            .tag_candidates(b"moov")
            .into_iter()
            .take(MAX_END_CANDIDATES)
            .collect()
    };

    match scan_window(&tail, base, &starts, config) {
        Some((header, header_reads)) => Ok(BoxScan {
            header,
            window: ScanWindow::End,
            format,
            header_reads,
        }),
        None => {
            debug!("no duration header in the last {} bytes", tail.len());
            Err(ParseError::NotFound.into())
        }
    }
}
