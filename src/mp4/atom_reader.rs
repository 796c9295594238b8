use crate::errors::ParseError;

/// Bounded random-access reads over one fetched window of a source.
///
/// Offsets are local to the window; `base` is the window's position in the
/// source and only shows up in error reports.
#[derive(Debug, Clone, Copy)]
pub struct AtomReader<'a> {
    data: &'a [u8],
    base: u64,
}

impl<'a> AtomReader<'a> {
    pub fn new(data: &'a [u8], base: u64) -> Self {
        Self { data, base }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Source offset of local offset 0.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Borrow `length` bytes at local `offset`, or fail with `ShortRead`.
    pub fn read_range(&self, offset: u64, length: u64) -> Result<&'a [u8], ParseError> {
        let short = || ParseError::ShortRead {
            offset: self.base.saturating_add(offset),
            requested: length,
            available: self.len().saturating_sub(offset),
        };
        let end = offset.checked_add(length).ok_or_else(short)?;
        if end > self.len() {
            return Err(short());
        }
        Ok(&self.data[offset as usize..end as usize])
    }

    /// Local offsets `i` where `tag` occurs at `i + 4`, i.e. where a box of
    /// that type would start.
    pub fn tag_candidates(&self, tag: &[u8; 4]) -> Vec<u64> {
        if self.data.len() < 8 {
            return Vec::new();
        }
        (4..=self.data.len() - 4)
            .filter(|&i| &self.data[i..i + 4] == tag)
            .map(|i| (i - 4) as u64)
            .collect()
    }
}
