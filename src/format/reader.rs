//! Document reading: header, then row-major body decode.

use std::io::{BufRead, Read};
use std::sync::Arc;

use super::header::parse_header;
use super::line_reader::LineReader;
use super::{Format, ReadOptions};
use crate::core::{ColumnCodec, Element, IndexWidth};
use crate::util::{Endianness, Result};
use crate::Document;

/// Per-property decode plan of one element.
fn column_codecs(element: &Element) -> Result<Vec<(Arc<dyn ColumnCodec>, Option<IndexWidth>)>> {
    element
        .properties()
        .map(|p| {
            let descriptor = element.types().lookup(p.list_type()?)?;
            Ok((Arc::clone(descriptor.codec()), p.read_index_width()))
        })
        .collect()
}

/// Clear `doc` and fill it from `source`.
///
/// On error the document is left partially populated.
pub(crate) fn read_document<R: BufRead>(doc: &mut Document, source: R, options: ReadOptions) -> Result<()> {
    doc.clear();

    let mut lines = LineReader::new(source).with_inline_comment(options.inline_comment);
    let (format, endian) = parse_header(&mut lines, doc)?;

    if options.crlf_heuristic && lines.swallow_pair_half()? {
        tracing::warn!(
            "consumed paired line terminator after header (cr={}, lf={})",
            lines.cr_count(),
            lines.lf_count()
        );
    }

    match format {
        Format::Ascii => read_ascii_body(&mut lines, doc),
        Format::Binary => read_binary_body(lines.inner_mut(), doc, endian),
    }
}

fn read_ascii_body<R: BufRead>(lines: &mut LineReader<R>, doc: &mut Document) -> Result<()> {
    let mut tokens = lines.tokens();
    for element in doc.elements_mut() {
        let codecs = column_codecs(element)?;
        tracing::trace!("reading {} rows of '{}' (ascii)", element.rows(), element.name());
        // Rows without properties occupy no input.
        if codecs.is_empty() {
            continue;
        }
        for row in 0..element.rows() {
            for (property, (codec, _)) in element.properties_mut().zip(&codecs) {
                let (_, column) = property.column_mut()?;
                codec.decode_ascii(column, row, &mut tokens)?;
            }
        }
    }
    if tokens.leftover() > 0 {
        tracing::debug!("ignoring {} trailing tokens after body", tokens.leftover());
    }
    Ok(())
}

fn read_binary_body<R: Read>(input: &mut R, doc: &mut Document, endian: Endianness) -> Result<()> {
    for element in doc.elements_mut() {
        let codecs = column_codecs(element)?;
        tracing::trace!("reading {} rows of '{}' ({})", element.rows(), element.name(), endian);
        // Rows without properties occupy no input.
        if codecs.is_empty() {
            continue;
        }
        for row in 0..element.rows() {
            for (property, (codec, index)) in element.properties_mut().zip(&codecs) {
                let (_, column) = property.column_mut()?;
                codec.decode_binary(column, row, *index, endian, input)?;
            }
        }
    }
    Ok(())
}
