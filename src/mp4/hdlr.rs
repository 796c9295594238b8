/// Handler type of an `hdlr` payload (`vide`, `soun`, `text`...).
///
/// Layout: version/flags (4), pre_defined (4), handler_type (4).
pub fn parse_handler_type(hdlr: &[u8]) -> Option<[u8; 4]> {
    let bytes = hdlr.get(8..12)?;
    let mut tag = [0u8; 4];
    tag.copy_from_slice(bytes);
    Some(tag)
}

/// Build an hdlr payload for the given handler.
#[cfg(test)]
pub(crate) fn handler_payload(handler: &[u8; 4]) -> Vec<u8> {
    let mut payload = vec![0u8; 8];
    payload.extend_from_slice(handler);
    payload.extend_from_slice(&[0u8; 13]);
    payload
}
