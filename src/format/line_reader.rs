//! Line splitting for headers and ASCII bodies.
//!
//! Lines may end in CR, LF, or either pair. Every terminator byte is
//! tallied so the header parser can guess whether pairs were used, and the
//! underlying reader is left positioned right after the last terminator
//! consumed, which is where a binary body starts.

use std::collections::VecDeque;
use std::io::{self, BufRead};

use super::{KW_COMMENT, KW_OBJ_INFO};
use crate::core::TokenSource;
use crate::util::{Error, Result};

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// A trimmed, non-blank line and its 1-based position in the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub text: String,
}

/// Reads logical lines from a buffered byte stream.
pub struct LineReader<R> {
    inner: R,
    line_no: usize,
    cr_count: usize,
    lf_count: usize,
    last_terminator: Option<u8>,
    pair_open: bool,
    inline_comment: Option<u8>,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line_no: 0,
            cr_count: 0,
            lf_count: 0,
            last_terminator: None,
            pair_open: false,
            inline_comment: None,
            buf: Vec::new(),
        }
    }

    /// Truncate lines at `marker` (except comment lines).
    pub fn with_inline_comment(mut self, marker: Option<u8>) -> Self {
        self.inline_comment = marker;
        self
    }

    /// Number of the last physical line read.
    #[inline]
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    /// Carriage returns consumed as terminators so far.
    #[inline]
    pub fn cr_count(&self) -> usize {
        self.cr_count
    }

    /// Line feeds consumed as terminators so far.
    #[inline]
    pub fn lf_count(&self) -> usize {
        self.lf_count
    }

    /// Terminator byte that ended the last line.
    #[inline]
    pub fn last_terminator(&self) -> Option<u8> {
        self.last_terminator
    }

    /// Underlying reader, positioned after the last consumed terminator.
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Read raw bytes up to the next CR or LF into `self.buf`.
    ///
    /// Returns false at end of input with nothing read.
    fn read_raw(&mut self) -> io::Result<bool> {
        self.buf.clear();
        loop {
            let available = self.inner.fill_buf()?;
            if available.is_empty() {
                if !self.buf.is_empty() {
                    self.line_no += 1;
                    self.pair_open = false;
                }
                return Ok(!self.buf.is_empty());
            }
            match available.iter().position(|&b| b == CR || b == LF) {
                Some(pos) => {
                    let terminator = available[pos];
                    self.buf.extend_from_slice(&available[..pos]);
                    self.inner.consume(pos + 1);
                    self.note_terminator(terminator);
                    return Ok(true);
                }
                None => {
                    let n = available.len();
                    self.buf.extend_from_slice(available);
                    self.inner.consume(n);
                }
            }
        }
    }

    fn note_terminator(&mut self, terminator: u8) {
        if terminator == CR {
            self.cr_count += 1;
        } else {
            self.lf_count += 1;
        }

        // The second half of a CR+LF or LF+CR pair shows up as an empty
        // segment; it does not start a new physical line.
        let pairs_previous = self.pair_open
            && self.buf.is_empty()
            && self.last_terminator.is_some_and(|prev| prev != terminator);
        if pairs_previous {
            self.pair_open = false;
        } else {
            self.line_no += 1;
            self.pair_open = true;
        }
        self.last_terminator = Some(terminator);
    }

    /// Next non-blank line, trimmed and stripped of inline comments.
    pub fn next_line(&mut self) -> Result<Option<Line>> {
        while self.read_raw()? {
            let raw = String::from_utf8_lossy(&self.buf);
            let mut text = raw.trim();
            if let Some(marker) = self.inline_comment {
                if !is_comment_line(text) {
                    if let Some(pos) = text.find(marker as char) {
                        text = text[..pos].trim_end();
                    }
                }
            }
            if !text.is_empty() {
                return Ok(Some(Line { number: self.line_no, text: text.to_string() }));
            }
        }
        Ok(None)
    }

    /// If the next byte is the complement of the last terminator and,
    /// counting it, CR and LF terminators were used about equally often
    /// (ratio within 0.5 +- 0.1), consume it as the second half of a pair.
    ///
    /// Returns true if a byte was consumed.
    pub fn swallow_pair_half(&mut self) -> Result<bool> {
        let complement = match self.last_terminator {
            Some(CR) => LF,
            Some(_) => CR,
            None => return Ok(false),
        };
        let next = self.inner.fill_buf()?.first().copied();
        if next != Some(complement) {
            return Ok(false);
        }

        let (cr, lf) = if complement == CR {
            (self.cr_count + 1, self.lf_count)
        } else {
            (self.cr_count, self.lf_count + 1)
        };
        if !looks_paired(cr, lf) {
            return Ok(false);
        }

        self.inner.consume(1);
        self.note_terminator(complement);
        Ok(true)
    }

    /// Token source over the remaining lines, for ASCII bodies.
    pub fn tokens(&mut self) -> AsciiTokens<'_, R> {
        AsciiTokens { lines: self, pending: VecDeque::new() }
    }
}

/// |cr / (cr + lf) - 0.5| < 0.1, in integers.
fn looks_paired(cr: usize, lf: usize) -> bool {
    let total = cr + lf;
    total > 0 && 5 * cr.abs_diff(lf) < total
}

fn is_comment_line(text: &str) -> bool {
    [KW_COMMENT, KW_OBJ_INFO].iter().any(|kw| {
        text.strip_prefix(kw)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
    })
}

/// Whitespace-separated tokens of an ASCII body, spanning lines freely.
pub struct AsciiTokens<'a, R> {
    lines: &'a mut LineReader<R>,
    pending: VecDeque<String>,
}

impl<R> AsciiTokens<'_, R> {
    /// Tokens read but not yet consumed.
    pub fn leftover(&self) -> usize {
        self.pending.len()
    }
}

impl<R: BufRead> TokenSource for AsciiTokens<'_, R> {
    fn next_token(&mut self) -> Result<String> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
            match self.lines.next_line()? {
                Some(line) => self.pending.extend(line.text.split_whitespace().map(str::to_string)),
                None => {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("ASCII body ended after line {}", self.lines.line_number()),
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(data: &[u8]) -> Vec<Line> {
        let mut reader = LineReader::new(data);
        let mut out = Vec::new();
        while let Some(line) = reader.next_line().unwrap() {
            out.push(line);
        }
        out
    }

    fn texts(data: &[u8]) -> Vec<String> {
        lines_of(data).into_iter().map(|l| l.text).collect()
    }

    #[test]
    fn test_all_terminators() {
        let expected = ["ply", "format ascii 1.0", "end_header"];
        assert_eq!(texts(b"ply\nformat ascii 1.0\nend_header\n"), expected);
        assert_eq!(texts(b"ply\rformat ascii 1.0\rend_header\r"), expected);
        assert_eq!(texts(b"ply\r\nformat ascii 1.0\r\nend_header\r\n"), expected);
        assert_eq!(texts(b"ply\n\rformat ascii 1.0\n\rend_header"), expected);
    }

    #[test]
    fn test_line_numbers_with_pairs_and_blanks() {
        let lines = lines_of(b"a\r\n\r\n  b  \r\nc");
        let numbered: Vec<(usize, &str)> = lines.iter().map(|l| (l.number, l.text.as_str())).collect();
        assert_eq!(numbered, [(1, "a"), (3, "b"), (4, "c")]);
    }

    #[test]
    fn test_terminator_tally() {
        let mut reader = LineReader::new(&b"ply\r\nformat ascii 1.0\r\nend_header\r\nrest"[..]);
        for _ in 0..3 {
            reader.next_line().unwrap();
        }
        assert_eq!(reader.cr_count(), 3);
        assert_eq!(reader.lf_count(), 2);
        assert_eq!(reader.last_terminator(), Some(CR));
        assert!(reader.swallow_pair_half().unwrap());
        assert!(!reader.swallow_pair_half().unwrap());

        let mut rest = String::new();
        std::io::Read::read_to_string(reader.inner_mut(), &mut rest).unwrap();
        assert_eq!(rest, "rest");
    }

    #[test]
    fn test_lf_only_is_not_paired() {
        let mut reader = LineReader::new(&b"ply\nformat ascii 1.0\nend_header\n\rX"[..]);
        for _ in 0..3 {
            reader.next_line().unwrap();
        }
        assert!(!reader.swallow_pair_half().unwrap());
        assert_eq!(reader.inner_mut().fill_buf().unwrap()[0], CR);
    }

    #[test]
    fn test_paired_ratio() {
        assert!(looks_paired(3, 3));
        assert!(looks_paired(10, 9));
        assert!(!looks_paired(3, 1));
        assert!(!looks_paired(0, 4));
        assert!(!looks_paired(0, 0));
    }

    #[test]
    fn test_inline_comments() {
        let mut reader = LineReader::new(&b"element v 3 # three\n# only a note\ncomment keep # this\n"[..])
            .with_inline_comment(Some(b'#'));
        assert_eq!(reader.next_line().unwrap().unwrap().text, "element v 3");
        let line = reader.next_line().unwrap().unwrap();
        assert_eq!(line.text, "comment keep # this");
        assert_eq!(line.number, 3);
        assert!(reader.next_line().unwrap().is_none());
    }

    #[test]
    fn test_tokens_span_lines() {
        let mut reader = LineReader::new(&b"1 2\n\n   3\t4\r\n5"[..]);
        let mut tokens = reader.tokens();
        let got: Vec<String> = (0..5).map(|_| tokens.next_token().unwrap()).collect();
        assert_eq!(got, ["1", "2", "3", "4", "5"]);
        assert!(matches!(tokens.next_token(), Err(Error::Io(_))));
    }
}
