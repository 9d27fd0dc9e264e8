//! Header parsing.
//!
//! The header is a small state machine: magic line, format line, then any
//! number of comment/obj_info/element/property declarations until
//! `end_header` (or the end of input). Declarations are applied to the
//! document as they are read; properties are bound eagerly to the type
//! named in the header.

use std::io::BufRead;

use super::line_reader::{Line, LineReader};
use super::{
    parse_format_keyword, Format, KW_COMMENT, KW_ELEMENT, KW_END_HEADER, KW_FORMAT, KW_LIST,
    KW_OBJ_INFO, KW_PROPERTY, MAGIC, VERSION,
};
use crate::core::{IndexWidth, TypeKey};
use crate::util::{Endianness, Error, Result};
use crate::Document;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Magic,
    Format,
    Declarations,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    EndHeader,
}

struct HeaderParser<'a> {
    doc: &'a mut Document,
    state: State,
    encoding: (Format, Endianness),
    current: Option<String>,
}

/// Parse the header from `lines` into `doc` and return the body encoding.
///
/// `doc` is expected to be empty.
pub(crate) fn parse_header<R: BufRead>(
    lines: &mut LineReader<R>,
    doc: &mut Document,
) -> Result<(Format, Endianness)> {
    let mut parser = HeaderParser {
        doc,
        state: State::Magic,
        encoding: (Format::Ascii, Endianness::native()),
        current: None,
    };

    loop {
        let Some(line) = lines.next_line()? else {
            if parser.state != State::Declarations {
                return Err(Error::malformed(
                    lines.line_number() + 1,
                    "input ended before the format line",
                ));
            }
            tracing::debug!("header ended at end of input without {}", KW_END_HEADER);
            break;
        };
        if parser.feed(&line)? == Flow::EndHeader {
            break;
        }
    }

    tracing::debug!(
        "parsed header: {} elements, {} comments, format {:?} {}",
        parser.doc.num_elements(),
        parser.doc.comments().len(),
        parser.encoding.0,
        parser.encoding.1
    );
    Ok(parser.encoding)
}

/// Text after `keyword` and one separator.
fn remainder<'t>(text: &'t str, keyword: &str) -> &'t str {
    let rest = &text[keyword.len()..];
    rest.strip_prefix(char::is_whitespace).unwrap_or(rest)
}

impl HeaderParser<'_> {
    fn feed(&mut self, line: &Line) -> Result<Flow> {
        match self.state {
            State::Magic => {
                if line.text != MAGIC {
                    return Err(Error::malformed(line.number, format!("expected '{}' magic line", MAGIC)));
                }
                self.state = State::Format;
                Ok(Flow::Continue)
            }
            State::Format => {
                self.format_line(line)?;
                self.state = State::Declarations;
                Ok(Flow::Continue)
            }
            State::Declarations => self.declaration(line),
        }
    }

    fn format_line(&mut self, line: &Line) -> Result<()> {
        let tokens: Vec<&str> = line.text.split_whitespace().collect();
        if tokens.len() != 3 || tokens[0] != KW_FORMAT {
            return Err(Error::malformed(
                line.number,
                format!("expected '{} <encoding> {}'", KW_FORMAT, VERSION),
            ));
        }
        self.encoding = parse_format_keyword(tokens[1]).ok_or_else(|| {
            Error::malformed(line.number, format!("unknown encoding '{}'", tokens[1]))
        })?;
        if tokens[2] != VERSION {
            return Err(Error::UnsupportedVersion(tokens[2].to_string()));
        }
        Ok(())
    }

    fn declaration(&mut self, line: &Line) -> Result<Flow> {
        let tokens: Vec<&str> = line.text.split_whitespace().collect();
        match tokens[0] {
            KW_END_HEADER if tokens.len() == 1 => return Ok(Flow::EndHeader),
            KW_COMMENT => {
                let text = remainder(&line.text, KW_COMMENT).to_string();
                self.doc.comments_mut().push(text);
            }
            KW_OBJ_INFO => {
                let text = remainder(&line.text, KW_OBJ_INFO).to_string();
                self.doc.obj_info_mut().push(text);
            }
            KW_ELEMENT => self.element(line, &tokens)?,
            KW_PROPERTY => self.property(line, &tokens)?,
            other => {
                return Err(Error::malformed(line.number, format!("unexpected '{}'", other)));
            }
        }
        Ok(Flow::Continue)
    }

    fn element(&mut self, line: &Line, tokens: &[&str]) -> Result<()> {
        let [_, name, rows] = tokens else {
            return Err(Error::malformed(line.number, "expected 'element <name> <count>'"));
        };
        let rows: usize = rows
            .parse()
            .map_err(|_| Error::malformed(line.number, format!("invalid element count '{}'", rows)))?;

        // A repeated declaration selects the existing element again.
        if let Ok(existing) = self.doc.element(name) {
            tracing::warn!(
                "line {}: element '{}' declared again with {} rows, keeping {}",
                line.number,
                name,
                rows,
                existing.rows()
            );
        } else {
            tracing::trace!("element {} ({} rows)", name, rows);
        }
        self.doc.add_element(name, rows);
        self.current = Some(name.to_string());
        Ok(())
    }

    fn property(&mut self, line: &Line, tokens: &[&str]) -> Result<()> {
        let Some(current) = self.current.as_deref() else {
            return Err(Error::malformed(line.number, "property declared before any element"));
        };

        let (name, key, index) = match tokens {
            [_, list, index, value, name] if *list == KW_LIST => {
                let index = self.index_width(line, index)?;
                let key = self.resolve(value, true)?;
                (*name, key, Some(index))
            }
            [_, value, name] if *value != KW_LIST => (*name, self.resolve(value, false)?, None),
            _ => {
                return Err(Error::malformed(
                    line.number,
                    "expected 'property <type> <name>' or 'property list <index> <type> <name>'",
                ));
            }
        };

        let element = self.doc.element_mut(current)?;
        if element.contains(name) {
            return Err(Error::malformed(
                line.number,
                format!("duplicate property '{}' in element '{}'", name, current),
            ));
        }
        tracing::trace!("property {}.{}: {}", current, name, key);
        let property = element.property_typed(name, key).map_err(|e| match e {
            Error::TooManyRows(rows) => Error::malformed(
                line.number,
                format!("cannot allocate {} rows for property '{}'", rows, name),
            ),
            other => other,
        })?;
        property.set_read_index_width(index);
        Ok(())
    }

    fn resolve(&self, type_name: &str, is_list: bool) -> Result<TypeKey> {
        self.doc
            .types()
            .resolve_by_name(type_name, is_list)
            .map(|d| d.key())
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))
    }

    fn index_width(&self, line: &Line, type_name: &str) -> Result<IndexWidth> {
        let invalid = || Error::InvalidListIndexType { line: line.number, name: type_name.to_string() };
        let key = self.resolve(type_name, false).map_err(|_| invalid())?;
        if key.is::<u8>() {
            Ok(IndexWidth::U8)
        } else if key.is::<u16>() {
            Ok(IndexWidth::U16)
        } else if key.is::<u32>() {
            Ok(IndexWidth::U32)
        } else {
            Err(invalid())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<(Document, Format, Endianness)> {
        let mut doc = Document::new();
        let mut lines = LineReader::new(text.as_bytes()).with_inline_comment(Some(b'#'));
        let (format, endian) = parse_header(&mut lines, &mut doc)?;
        Ok((doc, format, endian))
    }

    fn header_error_line(text: &str) -> usize {
        match parse(text) {
            Err(Error::MalformedHeader { line, .. }) => line,
            other => panic!("expected malformed header, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_full_header() {
        let (doc, format, endian) = parse(
            "ply\nformat binary_big_endian 1.0\ncomment made by hand\nobj_info scanner 3\n\
             element vertex 8\nproperty float32 x\nproperty uchar red\n\
             element face 6\nproperty list uint8 int vertex_indices\nend_header\n",
        )
        .unwrap();
        assert_eq!(format, Format::Binary);
        assert_eq!(endian, Endianness::Big);
        assert_eq!(doc.comments(), ["made by hand"]);
        assert_eq!(doc.obj_info(), ["scanner 3"]);

        let vertex = doc.element("vertex").unwrap();
        assert_eq!(vertex.rows(), 8);
        assert_eq!(vertex.get("x").unwrap().list_type().unwrap(), TypeKey::scalar::<f32>());
        assert_eq!(vertex.get("red").unwrap().values::<u8>().unwrap().len(), 8);

        let face = doc.element("face").unwrap();
        let vi = face.get("vertex_indices").unwrap();
        assert_eq!(vi.list_type().unwrap(), TypeKey::list::<i32>());
        assert_eq!(vi.read_index_width(), Some(IndexWidth::U8));
    }

    #[test]
    fn test_comment_keeps_inner_spacing() {
        let (doc, ..) = parse("ply\nformat ascii 1.0\ncomment  two  spaces # kept\ncomment\nend_header\n").unwrap();
        assert_eq!(doc.comments(), [" two  spaces # kept", ""]);

        // Trailing whitespace belongs to the line, not the comment.
        let (doc, ..) = parse("ply\nformat ascii 1.0\ncomment padded \t \nobj_info x  \nend_header\n").unwrap();
        assert_eq!(doc.comments(), ["padded"]);
        assert_eq!(doc.obj_info(), ["x"]);
    }

    #[test]
    fn test_bad_magic() {
        assert_eq!(header_error_line("plx\nformat ascii 1.0\nend_header\n"), 1);
        assert_eq!(header_error_line("\n\n  \nformat ascii 1.0\n"), 4);
    }

    #[test]
    fn test_bad_format_line() {
        assert_eq!(header_error_line("ply\nformat ascii\nend_header\n"), 2);
        assert_eq!(header_error_line("ply\nformat utf8 1.0\nend_header\n"), 2);
        assert_eq!(header_error_line("ply\nformats ascii 1.0\nend_header\n"), 2);
        assert!(matches!(
            parse("ply\nformat ascii 2.0\nend_header\n"),
            Err(Error::UnsupportedVersion(ref v)) if v == "2.0"
        ));
        assert_eq!(header_error_line("ply\n"), 2);
    }

    #[test]
    fn test_bad_declarations() {
        let base = "ply\nformat ascii 1.0\n";
        assert_eq!(header_error_line(&format!("{base}elements v 1\nend_header\n")), 3);
        assert_eq!(header_error_line(&format!("{base}element v\nend_header\n")), 3);
        assert_eq!(header_error_line(&format!("{base}element v -1\nend_header\n")), 3);
        assert_eq!(header_error_line(&format!("{base}property float x\nend_header\n")), 3);
        assert_eq!(header_error_line(&format!("{base}element v 1\nproperty float\nend_header\n")), 4);
        assert_eq!(header_error_line(&format!("{base}element v 1\nproperty list uchar x\nend_header\n")), 4);
        assert_eq!(
            header_error_line(&format!("{base}element v 1\nproperty float x\nproperty int x\nend_header\n")),
            5
        );
        assert_eq!(header_error_line(&format!("{base}end_header now\n")), 3);
    }

    #[test]
    fn test_redeclared_element_is_selected_again() {
        let (doc, ..) = parse(
            "ply\nformat ascii 1.0\nelement v 2\nproperty float x\nelement f 1\n\
             element v 9\nproperty uchar y\nend_header\n",
        )
        .unwrap();
        let names: Vec<&str> = doc.elements().map(|e| e.name()).collect();
        assert_eq!(names, ["v", "f"]);

        let v = doc.element("v").unwrap();
        assert_eq!(v.rows(), 2);
        let props: Vec<&str> = v.properties().map(|p| p.name()).collect();
        assert_eq!(props, ["x", "y"]);
        assert_eq!(v.get("y").unwrap().values::<u8>().unwrap().len(), 2);
        assert_eq!(doc.element("f").unwrap().num_properties(), 0);

        // Re-selecting does not allow a property to be declared twice.
        let base = "ply\nformat ascii 1.0\nelement v 1\nproperty float x\n";
        assert_eq!(header_error_line(&format!("{base}element v 1\nproperty int x\nend_header\n")), 6);
    }

    #[test]
    fn test_huge_row_count_is_a_header_error() {
        let text = format!("ply\nformat ascii 1.0\nelement v {}\nproperty double x\nend_header\n", usize::MAX);
        assert_eq!(header_error_line(&text), 4);
    }

    #[test]
    fn test_unknown_types() {
        let base = "ply\nformat ascii 1.0\nelement v 1\n";
        assert!(matches!(
            parse(&format!("{base}property int64 x\nend_header\n")),
            Err(Error::UnknownType(ref t)) if t == "int64"
        ));
        assert!(matches!(
            parse(&format!("{base}property list int int x\nend_header\n")),
            Err(Error::InvalidListIndexType { line: 4, ref name }) if name == "int"
        ));
        assert!(matches!(
            parse(&format!("{base}property list foo int x\nend_header\n")),
            Err(Error::InvalidListIndexType { .. })
        ));
        assert!(matches!(
            parse(&format!("{base}property list ushort quad x\nend_header\n")),
            Err(Error::UnknownType(_))
        ));
    }

    #[test]
    fn test_header_without_end_marker() {
        let (doc, format, _) = parse("ply\r\nformat ascii 1.0\r\nelement v 0\r\n").unwrap();
        assert_eq!(format, Format::Ascii);
        assert_eq!(doc.element("v").unwrap().rows(), 0);
    }
}
