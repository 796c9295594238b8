pub mod atom_reader;
pub use atom_reader::AtomReader;
pub mod r#box;
pub use r#box::{read_box_header, BoxHeader};
pub mod fields;
pub use fields::MediaHeaderFields;
pub mod ftyp;
pub use ftyp::{detect_format, ContainerFormat};
pub mod hdlr;
pub mod mdhd;
pub use mdhd::parse_mdhd;
pub mod mvhd;
pub use mvhd::parse_mvhd;
pub mod traversal; // Windowed, budgeted box walk
pub use traversal::{find_duration, scan_window, BoxScan, DurationHeader, HeaderKind, ScanWindow};
