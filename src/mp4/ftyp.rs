use serde::Serialize;

/// Container format detected from the leading bytes of a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ContainerFormat {
    MP4,
    M4V,
    ThreeGP,
    ThreeG2,
    MOV,
    MP3,
    Unknown(String),
}

impl ContainerFormat {
    pub fn name(&self) -> &str {
        match self {
            ContainerFormat::MP4 => "MP4",
            ContainerFormat::M4V => "M4V",
            ContainerFormat::ThreeGP => "3GP",
            ContainerFormat::ThreeG2 => "3G2",
            ContainerFormat::MOV => "MOV",
            ContainerFormat::MP3 => "MP3",
            ContainerFormat::Unknown(s) => s,
        }
    }

    /// Formats whose duration lives in a box tree.
    pub fn is_box_structured(&self) -> bool {
        !matches!(self, ContainerFormat::MP3)
    }
}

/// Detect the container format from the first bytes of a source.
///
/// Anything that is neither an ftyp-led ISO file nor an MP3 stream is
/// `Unknown`: QuickTime files without ftyp still parse as box trees.
pub fn detect_format(header: &[u8]) -> ContainerFormat {
    if header.len() >= 3 && &header[0..3] == b"ID3" {
        return ContainerFormat::MP3;
    }
    if header.len() >= 2 && header[0] == 0xFF && (header[1] & 0xE0) == 0xE0 {
        return ContainerFormat::MP3;
    }

    if header.len() >= 12 && &header[4..8] == b"ftyp" {
        let major_brand = String::from_utf8_lossy(&header[8..12]).into_owned();
        return parse_ftyp_brand(&major_brand);
    }

    ContainerFormat::Unknown("no ftyp".to_string())
}

/// Parse ftyp major brand and return corresponding container format
pub fn parse_ftyp_brand(major_brand: &str) -> ContainerFormat {
    match major_brand {
        "isom" | "mp41" | "mp42" | "iso2" | "iso4" | "iso5" | "iso6" | "avc1" | "dash" => {
            ContainerFormat::MP4
        }
        "M4V " | "M4VH" | "M4VP" => ContainerFormat::M4V,
        "3gp4" | "3gp5" | "3gp6" | "3gp7" | "3ge6" | "3ge7" | "3gg6" => ContainerFormat::ThreeGP,
        "3g2a" | "3g2b" | "3g2c" => ContainerFormat::ThreeG2,
        "qt  " => ContainerFormat::MOV,
        _ => ContainerFormat::Unknown(major_brand.to_string()),
    }
}
