#![allow(dead_code)]

use mediaduration::ResolverConfig;

pub fn make_box(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut buf = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    buf.extend_from_slice(name);
    buf.extend_from_slice(payload);
    buf
}

/// Version 0 `mvhd`/`mdhd` payload: version/flags, two timestamps, then
/// timescale and a 32-bit duration.
pub fn header_payload_v0(timescale: u32, duration: u32, tail: usize) -> Vec<u8> {
    let mut payload = vec![0u8; 12];
    payload.extend_from_slice(&timescale.to_be_bytes());
    payload.extend_from_slice(&duration.to_be_bytes());
    payload.resize(payload.len() + tail, 0);
    payload
}

/// Version 1 payload with 64-bit timestamps and duration.
pub fn header_payload_v1(timescale: u32, duration: u64, tail: usize) -> Vec<u8> {
    let mut payload = vec![1u8, 0, 0, 0];
    payload.extend_from_slice(&[0u8; 16]);
    payload.extend_from_slice(&timescale.to_be_bytes());
    payload.extend_from_slice(&duration.to_be_bytes());
    payload.resize(payload.len() + tail, 0);
    payload
}

pub fn handler_payload(handler: &[u8; 4]) -> Vec<u8> {
    let mut payload = vec![0u8; 8];
    payload.extend_from_slice(handler);
    payload.extend_from_slice(&[0u8; 13]);
    payload
}

pub fn ftyp(brand: &[u8; 4]) -> Vec<u8> {
    let mut payload = brand.to_vec();
    payload.extend_from_slice(&[0, 0, 2, 0]);
    payload.extend_from_slice(b"isomiso2mp41");
    make_box(b"ftyp", &payload)
}

pub fn mvhd(timescale: u32, duration: u32) -> Vec<u8> {
    make_box(b"mvhd", &header_payload_v0(timescale, duration, 80))
}

pub fn mvhd_v1(timescale: u32, duration: u64) -> Vec<u8> {
    make_box(b"mvhd", &header_payload_v1(timescale, duration, 80))
}

pub fn trak(handler: &[u8; 4], timescale: u32, duration: u32) -> Vec<u8> {
    let mdhd = make_box(b"mdhd", &header_payload_v0(timescale, duration, 4));
    let hdlr = make_box(b"hdlr", &handler_payload(handler));
    let mdia = make_box(b"mdia", &[mdhd, hdlr].concat());
    make_box(b"trak", &mdia)
}

pub fn moov(children: &[Vec<u8>]) -> Vec<u8> {
    make_box(b"moov", &children.concat())
}

pub fn mdat(len: usize) -> Vec<u8> {
    make_box(b"mdat", &vec![0x5A; len])
}

/// Faststart layout: ftyp, moov, mdat.
pub fn faststart_mp4(timescale: u32, duration: u32) -> Vec<u8> {
    [ftyp(b"isom"), moov(&[mvhd(timescale, duration)]), mdat(1024)].concat()
}

/// Camera layout: the movie box trails a large mdat.
pub fn trailing_moov_mp4(timescale: u32, duration: u64, mdat_len: usize) -> Vec<u8> {
    [ftyp(b"isom"), mdat(mdat_len), moov(&[mvhd_v1(timescale, duration)])].concat()
}

/// Box parsing only; no external engine or network.
pub fn local_config() -> ResolverConfig {
    let mut config = ResolverConfig::default();
    config.probe.enabled = false;
    config
}
