//! Document writing: header from the element/property tables, then the body.

use std::io::Write;
use std::sync::Arc;

use super::{format_keyword, Format, FORBIDDEN_TEXT_CHARS, KW_COMMENT, KW_ELEMENT, KW_END_HEADER,
    KW_FORMAT, KW_LIST, KW_OBJ_INFO, KW_PROPERTY, MAGIC, VERSION};
use crate::core::{ColumnCodec, Element, IndexWidth};
use crate::util::{Endianness, Error, Result};
use crate::Document;

/// How one property is written.
struct ColumnPlan {
    type_name: String,
    index: Option<IndexWidth>,
    codec: Arc<dyn ColumnCodec>,
}

/// A name must survive as a single header token when read back.
fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || FORBIDDEN_TEXT_CHARS.contains(&c) || c == '#') {
        return Err(Error::InvalidName(format!("{:?}", name)));
    }
    Ok(())
}

/// Resolve codecs and list count widths before any byte is written, so a
/// document with bad names or unbound or unregistered properties fails cleanly.
fn plan_element(element: &Element) -> Result<Vec<ColumnPlan>> {
    check_name(element.name())?;
    element
        .properties()
        .map(|p| {
            check_name(p.name())?;
            let (key, column) = p.column()?;
            let descriptor = element.types().lookup(key)?;
            let codec = Arc::clone(descriptor.codec());
            let index = if key.is_list() {
                Some(IndexWidth::for_len(codec.max_list_len(column)?))
            } else {
                None
            };
            Ok(ColumnPlan { type_name: descriptor.name().to_string(), index, codec })
        })
        .collect()
}

fn header_text(doc: &Document, plans: &[Vec<ColumnPlan>], format: Format, endian: Endianness) -> String {
    let eol = doc.line_terminator().as_str();
    let mut text = String::new();
    let mut line = |s: String| {
        text.push_str(&s);
        text.push_str(eol);
    };

    line(MAGIC.to_string());
    line(format!("{} {} {}", KW_FORMAT, format_keyword(format, endian), VERSION));
    for (keyword, lines) in [(KW_COMMENT, doc.comments()), (KW_OBJ_INFO, doc.obj_info())] {
        for entry in lines {
            if entry.contains(FORBIDDEN_TEXT_CHARS) {
                tracing::warn!("skipping {} containing line breaks: {:?}", keyword, entry);
                continue;
            }
            line(format!("{} {}", keyword, entry));
        }
    }
    for (element, plan) in doc.elements().zip(plans) {
        line(format!("{} {} {}", KW_ELEMENT, element.name(), element.rows()));
        for (property, column) in element.properties().zip(plan) {
            match column.index {
                Some(index) => line(format!(
                    "{} {} {} {} {}",
                    KW_PROPERTY,
                    KW_LIST,
                    index.type_name(),
                    column.type_name,
                    property.name()
                )),
                None => line(format!("{} {} {}", KW_PROPERTY, column.type_name, property.name())),
            }
        }
    }
    line(KW_END_HEADER.to_string());
    text
}

/// Serialize `doc` to `out`. `endian` is ignored for ASCII bodies.
pub(crate) fn write_document<W: Write>(doc: &Document, out: &mut W, format: Format, endian: Endianness) -> Result<()> {
    let plans = doc.elements().map(plan_element).collect::<Result<Vec<_>>>()?;

    out.write_all(header_text(doc, &plans, format, endian).as_bytes())?;

    match format {
        Format::Ascii => write_ascii_body(doc, &plans, out),
        Format::Binary => write_binary_body(doc, &plans, endian, out),
    }
}

fn write_ascii_body<W: Write>(doc: &Document, plans: &[Vec<ColumnPlan>], out: &mut W) -> Result<()> {
    let eol = doc.line_terminator().as_str();
    let mut row_text = String::new();
    for (element, plan) in doc.elements().zip(plans) {
        tracing::trace!("writing {} rows of '{}' (ascii)", element.rows(), element.name());
        for row in 0..element.rows() {
            row_text.clear();
            for (i, (property, column)) in element.properties().zip(plan).enumerate() {
                if i > 0 {
                    row_text.push(' ');
                }
                let (_, data) = property.column()?;
                column.codec.encode_ascii(data, row, &mut row_text)?;
            }
            row_text.push_str(eol);
            out.write_all(row_text.as_bytes())?;
        }
    }
    Ok(())
}

fn write_binary_body<W: Write>(
    doc: &Document,
    plans: &[Vec<ColumnPlan>],
    endian: Endianness,
    out: &mut W,
) -> Result<()> {
    for (element, plan) in doc.elements().zip(plans) {
        tracing::trace!("writing {} rows of '{}' ({})", element.rows(), element.name(), endian);
        for row in 0..element.rows() {
            for (property, column) in element.properties().zip(plan) {
                let (_, data) = property.column()?;
                column.codec.encode_binary(data, row, column.index, endian, out)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::LineTerminator;

    fn written(doc: &Document, format: Format, endian: Endianness) -> Vec<u8> {
        let mut out = Vec::new();
        write_document(doc, &mut out, format, endian).unwrap();
        out
    }

    #[test]
    fn test_header_layout() {
        let mut doc = Document::new();
        doc.add_comment("hello");
        doc.obj_info_mut().push("scanner 3".to_string());
        let v = doc.add_element("vertex", 1);
        v.property("x").set(&[1.5f32]).unwrap();
        v.property("n").set_lists(&[vec![1u16, 2]]).unwrap();

        let text = String::from_utf8(written(&doc, Format::Ascii, Endianness::Little)).unwrap();
        assert_eq!(
            text,
            "ply\nformat ascii 1.0\ncomment hello\nobj_info scanner 3\nelement vertex 1\n\
             property float x\nproperty list uchar ushort n\nend_header\n1.5 2 1 2\n"
        );
    }

    #[test]
    fn test_forbidden_comment_skipped() {
        let mut doc = Document::new();
        doc.add_comment("ok");
        doc.comments_mut().push("bad\nline".to_string());
        let text = String::from_utf8(written(&doc, Format::Ascii, Endianness::Little)).unwrap();
        assert_eq!(text, "ply\nformat ascii 1.0\ncomment ok\nend_header\n");
    }

    #[test]
    fn test_crlf_terminator() {
        let mut doc = Document::new();
        doc.set_line_terminator(LineTerminator::CrLf);
        doc.add_element("v", 2).property("a").set(&[1u8, 2]).unwrap();
        let text = String::from_utf8(written(&doc, Format::Ascii, Endianness::Little)).unwrap();
        assert!(text.ends_with("end_header\r\n1\r\n2\r\n"));
        assert!(text.starts_with("ply\r\nformat ascii 1.0\r\n"));
    }

    #[test]
    fn test_binary_body_layout() {
        let mut doc = Document::new();
        let v = doc.add_element("v", 2);
        v.property("a").set(&[1u16, 0x0203]).unwrap();
        v.property("l").set_lists(&[vec![7i8], vec![]]).unwrap();

        let out = written(&doc, Format::Binary, Endianness::Big);
        let header_end = b"end_header\n";
        let pos = out.windows(header_end.len()).position(|w| w == header_end).unwrap();
        let body = &out[pos + header_end.len()..];
        assert_eq!(body, [0, 1, 1, 7, 2, 3, 0]);

        let le = written(&doc, Format::Binary, Endianness::Little);
        let body = &le[le.len() - 7..];
        assert_eq!(body, [1, 0, 1, 7, 3, 2, 0]);
    }

    #[test]
    fn test_index_width_from_data() {
        let mut doc = Document::new();
        doc.add_element("f", 1).property("i").set_lists(&[vec![0u32; 300]]).unwrap();
        let out = written(&doc, Format::Binary, Endianness::Little);
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("property list ushort uint i\n"));
        let pos = text.find("end_header\n").unwrap() + "end_header\n".len();
        assert_eq!(&out[pos..pos + 2], [0x2c, 0x01]);
        assert_eq!(out.len() - pos, 2 + 300 * 4);
    }

    #[test]
    fn test_unbound_property_fails_before_output() {
        let mut doc = Document::new();
        doc.add_element("v", 1).property("x");
        let mut out = Vec::new();
        let err = write_document(&doc, &mut out, Format::Ascii, Endianness::Little).unwrap_err();
        assert!(matches!(err, Error::NotBound(ref n) if n == "x"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_unregistered_type_fails() {
        let mut doc = Document::new();
        doc.add_element("v", 1).property("x").set(&[1u64]).unwrap();
        let mut out = Vec::new();
        let err = write_document(&doc, &mut out, Format::Binary, Endianness::Little).unwrap_err();
        assert!(matches!(err, Error::UnknownType(_)));
    }

    #[test]
    fn test_unwritable_names_fail_before_output() {
        for bad in ["", "two words", "tab\there", "line\nbreak", "cr\r", "hash#tag"] {
            let mut doc = Document::new();
            doc.add_element("v", 1).property(bad).set(&[1u8]).unwrap();
            let mut out = Vec::new();
            let err = write_document(&doc, &mut out, Format::Ascii, Endianness::Little).unwrap_err();
            assert!(matches!(err, Error::InvalidName(_)), "property {:?}", bad);
            assert!(out.is_empty());

            let mut doc = Document::new();
            doc.add_element("ok", 1).property("a").set(&[1u8]).unwrap();
            doc.add_element(bad, 0);
            let mut out = Vec::new();
            let err = write_document(&doc, &mut out, Format::Binary, Endianness::Big).unwrap_err();
            assert!(matches!(err, Error::InvalidName(_)), "element {:?}", bad);
            assert!(out.is_empty());
        }
    }
}
