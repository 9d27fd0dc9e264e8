//! Low-level PLY file format: header grammar, line handling, body codecs.

mod line_reader;
mod header;
mod reader;
mod writer;

pub use line_reader::{Line, LineReader};

pub(crate) use reader::read_document;
pub(crate) use writer::write_document;

use std::fmt;

use crate::util::Endianness;

/// Magic line opening every file.
pub const MAGIC: &str = "ply";

/// The only supported format version.
pub const VERSION: &str = "1.0";

/// Header keywords.
pub const KW_FORMAT: &str = "format";
pub const KW_COMMENT: &str = "comment";
pub const KW_OBJ_INFO: &str = "obj_info";
pub const KW_ELEMENT: &str = "element";
pub const KW_PROPERTY: &str = "property";
pub const KW_LIST: &str = "list";
pub const KW_END_HEADER: &str = "end_header";

/// Characters that may not appear inside names or comment text.
pub const FORBIDDEN_TEXT_CHARS: &[char] = &['\n', '\u{0b}', '\u{0c}', '\r'];

/// Body encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Ascii,
    Binary,
}

/// Format-line keyword for a format/byte-order pair.
pub fn format_keyword(format: Format, endian: Endianness) -> &'static str {
    match (format, endian) {
        (Format::Ascii, _) => "ascii",
        (Format::Binary, Endianness::Little) => "binary_little_endian",
        (Format::Binary, Endianness::Big) => "binary_big_endian",
    }
}

/// Inverse of [`format_keyword`]. ASCII bodies report native order.
pub fn parse_format_keyword(keyword: &str) -> Option<(Format, Endianness)> {
    match keyword {
        "ascii" => Some((Format::Ascii, Endianness::native())),
        "binary_little_endian" => Some((Format::Binary, Endianness::Little)),
        "binary_big_endian" => Some((Format::Binary, Endianness::Big)),
        _ => None,
    }
}

/// Line terminator used when writing header and ASCII body lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineTerminator {
    #[default]
    Lf,
    Cr,
    CrLf,
}

impl LineTerminator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Cr => "\r",
            Self::CrLf => "\r\n",
        }
    }
}

impl fmt::Display for LineTerminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lf => write!(f, "LF"),
            Self::Cr => write!(f, "CR"),
            Self::CrLf => write!(f, "CRLF"),
        }
    }
}

/// Knobs for reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadOptions {
    /// Swallow the second half of a CR+LF / LF+CR pair after `end_header`
    /// when the header looks like it used paired terminators.
    ///
    /// This is a guess: on a binary body whose first byte happens to equal
    /// the complementary terminator, that byte is lost.
    pub crlf_heuristic: bool,
    /// Byte starting an inline comment in header and ASCII body lines.
    /// `comment` and `obj_info` lines are never truncated.
    pub inline_comment: Option<u8>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { crlf_heuristic: true, inline_comment: Some(b'#') }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the CR/LF pairing heuristic.
    pub fn crlf_heuristic(mut self, enabled: bool) -> Self {
        self.crlf_heuristic = enabled;
        self
    }

    /// Set or clear the inline comment marker.
    pub fn inline_comment(mut self, marker: Option<u8>) -> Self {
        self.inline_comment = marker;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_keywords() {
        for (format, endian) in [
            (Format::Binary, Endianness::Little),
            (Format::Binary, Endianness::Big),
        ] {
            let kw = format_keyword(format, endian);
            assert_eq!(parse_format_keyword(kw), Some((format, endian)));
        }
        assert_eq!(format_keyword(Format::Ascii, Endianness::Big), "ascii");
        assert_eq!(parse_format_keyword("ascii").map(|(f, _)| f), Some(Format::Ascii));
        assert_eq!(parse_format_keyword("binary"), None);
    }

    #[test]
    fn test_read_options_builder() {
        let opts = ReadOptions::new().crlf_heuristic(false).inline_comment(None);
        assert!(!opts.crlf_heuristic);
        assert_eq!(opts.inline_comment, None);
        assert!(ReadOptions::default().crlf_heuristic);
    }
}
