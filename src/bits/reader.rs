/*
# Bits Reader Module

 Big-endian readers over byte slices with cursor tracking. Every reader
 checks bounds first and returns `None` instead of panicking, so callers can
 turn a truncated buffer into a short-read condition.

 Key components:
 - Cursor readers: `read_u32()`, `read_u64()`, `read_fourcc()`
 - Fixed-offset reader: `u32_at()`, `u64_at()`
*/

/// Read a 32-bit big endian value from a byte slice advancing the position.
pub fn read_u32(data: &[u8], pos: &mut usize) -> Option<u32> {
    let v = u32_at(data, *pos)?;
    *pos += 4;
    Some(v)
}

/// Read a 64-bit big endian value from a byte slice advancing the position.
pub fn read_u64(data: &[u8], pos: &mut usize) -> Option<u64> {
    let v = u64_at(data, *pos)?;
    *pos += 8;
    Some(v)
}

/// Read a four character code advancing the position.
pub fn read_fourcc(data: &[u8], pos: &mut usize) -> Option<[u8; 4]> {
    if *pos + 4 > data.len() {
        return None;
    }
    let mut tag = [0u8; 4];
    tag.copy_from_slice(&data[*pos..*pos + 4]);
    *pos += 4;
    Some(tag)
}

/// 32-bit big endian value at a fixed offset.
pub fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// 64-bit big endian value at a fixed offset.
pub fn u64_at(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset.checked_add(8)?)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Some(u64::from_be_bytes(buf))
}
