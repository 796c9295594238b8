use super::fields::MediaHeaderFields;

/// Decode the whole-movie header payload.
pub fn parse_mvhd(mvhd: &[u8]) -> Option<MediaHeaderFields> {
    MediaHeaderFields::decode(mvhd)
}
