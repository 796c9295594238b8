use super::atom_reader::AtomReader;
use crate::bits::reader::{read_fourcc, read_u32, read_u64};
use crate::errors::ParseError;

/// Box header information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxHeader {
    pub box_type: [u8; 4],
    /// Local offset of the first header byte.
    pub offset: u64,
    /// Resolved size including the header. A declared size of 0 is already
    /// expanded to the end of the enclosing range.
    pub size: u64,
    /// 8, or 16 when the extended size field is present.
    pub header_size: u64,
}

impl BoxHeader {
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.box_type).into_owned()
    }

    pub fn payload_start(&self) -> u64 {
        self.offset + self.header_size
    }

    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    pub fn payload_len(&self) -> u64 {
        self.size - self.header_size
    }
}

/// Read the box header at `offset`, inside a level ending at `level_end`.
///
/// A short read means the level is truncated. A size smaller than the header
/// itself, or one that overflows, is reported as a malformed box.
pub fn read_box_header(
    reader: &AtomReader<'_>,
    offset: u64,
    level_end: u64,
) -> Result<BoxHeader, ParseError> {
    let head = reader.read_range(offset, 8)?;
    let mut pos = 0usize;
    let malformed = |size| ParseError::MalformedBox {
        offset: reader.base() + offset,
        size,
    };
    let size32 = read_u32(head, &mut pos).ok_or_else(|| malformed(0))?;
    let box_type = read_fourcc(head, &mut pos).ok_or_else(|| malformed(0))?;

    let (size, header_size) = match size32 {
        0 => (level_end.saturating_sub(offset), 8),
        1 => {
            let ext = reader.read_range(offset + 8, 8)?;
            let mut pos = 0usize;
            (read_u64(ext, &mut pos).ok_or_else(|| malformed(1))?, 16)
        }
        n => (n as u64, 8),
    };

    if size < header_size || offset.checked_add(size).is_none() {
        return Err(malformed(size));
    }

    Ok(BoxHeader {
        box_type,
        offset,
        size,
        header_size,
    })
}

/// Write a box header to a vector
#[cfg(test)]
pub(crate) fn write_box_header(output: &mut Vec<u8>, name: &[u8; 4], size: u32) {
    output.extend_from_slice(&size.to_be_bytes());
    output.extend_from_slice(name);
}

/// Wrap `payload` in a box with a compact 8-byte header.
#[cfg(test)]
pub(crate) fn make_box(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 8);
    write_box_header(&mut buf, name, (payload.len() + 8) as u32);
    buf.extend_from_slice(payload);
    buf
}

/// Wrap `payload` in a box using the 64-bit extended size form.
#[cfg(test)]
pub(crate) fn make_large_box(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 16);
    write_box_header(&mut buf, name, 1);
    buf.extend_from_slice(&(payload.len() as u64 + 16).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}
