use super::fields::MediaHeaderFields;

/// Decode a per-track media header payload.
pub fn parse_mdhd(mdhd: &[u8]) -> Option<MediaHeaderFields> {
    MediaHeaderFields::decode(mdhd)
}

/// Packed ISO 639-2/T language code following the duration field.
pub fn extract_language_from_mdhd(mdhd: &[u8]) -> Option<String> {
    let fields = parse_mdhd(mdhd)?;
    let at = if fields.version == 1 { 32 } else { 20 };
    let packed = u16::from_be_bytes([*mdhd.get(at)?, *mdhd.get(at + 1)?]);
    if packed == 0 {
        return Some("und".to_string());
    }

    // [pad bit][5 bits][5 bits][5 bits], each offset by 0x60
    let code: String = [10u16, 5, 0]
        .iter()
        .map(|shift| (((packed >> shift) & 0x1F) as u8 + 0x60) as char)
        .collect();

    if code.chars().all(|c| c.is_ascii_lowercase()) {
        Some(code)
    } else {
        Some("und".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4::fields::{header_payload_v0, header_payload_v1};

    #[test]
    fn test_parse_mdhd() {
        let fields = parse_mdhd(&header_payload_v1(48000, 480_000, 4)).unwrap();
        assert_eq!(fields.timescale, 48000);
        assert_eq!(fields.duration_seconds(), Some(10.0));
    }

    #[test]
    fn test_extract_language() {
        let mut mdhd = header_payload_v0(1, 1, 0);
        mdhd.extend_from_slice(&[0x15, 0xc7, 0, 0]);
        assert_eq!(extract_language_from_mdhd(&mdhd), Some("eng".to_string()));

        let mut mdhd = header_payload_v0(1, 1, 0);
        mdhd.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(extract_language_from_mdhd(&mdhd), Some("und".to_string()));
    }
}
