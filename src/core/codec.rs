//! Value and column codecs.
//!
//! A [`ValueCodec`] knows how to turn one value of `T` into ASCII or binary
//! and back. The registry wraps every value codec twice, once as a scalar
//! column and once as a list column, behind the type-erased
//! [`ColumnCodec`] trait so the body reader/writer can dispatch per
//! property without knowing `T`.

use std::any::Any;
use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::sync::Arc;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::util::{Endianness, Error, PlyScalar, Result};

/// Serializer/deserializer for single values of `T`.
///
/// Implement this to register a custom value type with
/// [`Document::register_type`](crate::Document::register_type).
pub trait ValueCodec<T>: Send + Sync + 'static {
    /// Header names for this type. The first one is used when writing,
    /// all of them are accepted when reading.
    fn names(&self) -> &[&str];

    /// Size of one value in a binary body.
    fn byte_width(&self) -> usize;

    /// Append the ASCII token for `value`.
    fn encode_ascii(&self, value: &T, out: &mut String);

    /// Parse an ASCII token, `None` if it is not a valid value.
    fn decode_ascii(&self, token: &str) -> Option<T>;

    /// Write `value` in the given byte order.
    fn encode_binary(&self, value: &T, endian: Endianness, out: &mut dyn Write) -> io::Result<()>;

    /// Read one value in the given byte order.
    fn decode_binary(&self, input: &mut dyn Read, endian: Endianness) -> io::Result<T>;
}

/// Codec for the built-in numeric types.
#[derive(Clone, Copy, Debug, Default)]
pub struct NumericCodec;

impl<T: PlyScalar> ValueCodec<T> for NumericCodec {
    fn names(&self) -> &[&str] {
        T::SCALAR_TYPE.names()
    }

    fn byte_width(&self) -> usize {
        T::SCALAR_TYPE.num_bytes()
    }

    fn encode_ascii(&self, value: &T, out: &mut String) {
        value.format_ascii(out);
    }

    fn decode_ascii(&self, token: &str) -> Option<T> {
        T::parse_ascii(token)
    }

    fn encode_binary(&self, value: &T, endian: Endianness, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(bytemuck::bytes_of(&value.to_order(endian)))
    }

    fn decode_binary(&self, input: &mut dyn Read, endian: Endianness) -> io::Result<T> {
        let mut value = T::zeroed();
        input.read_exact(bytemuck::bytes_of_mut(&mut value))?;
        Ok(value.to_order(endian))
    }
}

// ============================================================================
// List index width
// ============================================================================

/// Byte width of the count prefix in front of each binary list row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    /// Smallest width that can hold `max_len`.
    pub fn for_len(max_len: usize) -> Self {
        if max_len < 256 {
            Self::U8
        } else if max_len < 65536 {
            Self::U16
        } else {
            Self::U32
        }
    }

    /// Width in bytes.
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    /// Header name written for this width.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::U8 => "uchar",
            Self::U16 => "ushort",
            Self::U32 => "uint",
        }
    }

    /// Write a row length as a count prefix.
    pub fn write_count(self, len: usize, endian: Endianness, out: &mut dyn Write) -> Result<()> {
        let too_long = |_| Error::ListTooLong(len);
        match (self, endian) {
            (Self::U8, _) => out.write_u8(u8::try_from(len).map_err(too_long)?)?,
            (Self::U16, Endianness::Little) => {
                out.write_u16::<LittleEndian>(u16::try_from(len).map_err(too_long)?)?
            }
            (Self::U16, Endianness::Big) => {
                out.write_u16::<BigEndian>(u16::try_from(len).map_err(too_long)?)?
            }
            (Self::U32, Endianness::Little) => {
                out.write_u32::<LittleEndian>(u32::try_from(len).map_err(too_long)?)?
            }
            (Self::U32, Endianness::Big) => {
                out.write_u32::<BigEndian>(u32::try_from(len).map_err(too_long)?)?
            }
        }
        Ok(())
    }

    /// Read a count prefix.
    pub fn read_count(self, endian: Endianness, input: &mut dyn Read) -> Result<usize> {
        let len = match (self, endian) {
            (Self::U8, _) => input.read_u8()? as usize,
            (Self::U16, Endianness::Little) => input.read_u16::<LittleEndian>()? as usize,
            (Self::U16, Endianness::Big) => input.read_u16::<BigEndian>()? as usize,
            (Self::U32, Endianness::Little) => input.read_u32::<LittleEndian>()? as usize,
            (Self::U32, Endianness::Big) => input.read_u32::<BigEndian>()? as usize,
        };
        Ok(len)
    }
}

// ============================================================================
// Type-erased column codecs
// ============================================================================

/// Supplies whitespace-separated tokens of an ASCII body.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<String>;
}

/// Per-row encode/decode over a type-erased column buffer.
///
/// Column buffers are `Vec<T>` for scalar columns and `Vec<Vec<T>>` for
/// list columns, boxed as `dyn Any`.
pub trait ColumnCodec: Send + Sync {
    /// Zero-valued buffer with `rows` entries.
    ///
    /// Fails with `TooManyRows` if the buffer cannot be reserved.
    fn allocate(&self, rows: usize) -> Result<Box<dyn Any>>;

    /// Longest row of a list column, 0 for scalar columns.
    fn max_list_len(&self, column: &dyn Any) -> Result<usize>;

    fn encode_ascii(&self, column: &dyn Any, row: usize, out: &mut String) -> Result<()>;

    fn decode_ascii(&self, column: &mut dyn Any, row: usize, tokens: &mut dyn TokenSource) -> Result<()>;

    /// `index` is the count prefix width, required for list columns.
    fn encode_binary(
        &self,
        column: &dyn Any,
        row: usize,
        index: Option<IndexWidth>,
        endian: Endianness,
        out: &mut dyn Write,
    ) -> Result<()>;

    fn decode_binary(
        &self,
        column: &mut dyn Any,
        row: usize,
        index: Option<IndexWidth>,
        endian: Endianness,
        input: &mut dyn Read,
    ) -> Result<()>;
}

fn column_ref<C: 'static>(column: &dyn Any) -> Result<&C> {
    column.downcast_ref::<C>().ok_or_else(|| Error::TypeMismatch {
        expected: std::any::type_name::<C>().to_string(),
        actual: "foreign column buffer".to_string(),
    })
}

fn column_mut<C: 'static>(column: &mut dyn Any) -> Result<&mut C> {
    column.downcast_mut::<C>().ok_or_else(|| Error::TypeMismatch {
        expected: std::any::type_name::<C>().to_string(),
        actual: "foreign column buffer".to_string(),
    })
}

/// `rows` copies of `value`, reserved up front without aborting on failure.
pub(crate) fn filled_rows<V: Clone>(rows: usize, value: V) -> Result<Vec<V>> {
    let mut column = Vec::new();
    column.try_reserve_exact(rows).map_err(|_| Error::TooManyRows(rows))?;
    column.resize(rows, value);
    Ok(column)
}

fn row_out_of_range(row: usize, len: usize) -> Error {
    Error::body(format!("row {} out of range for column of {} rows", row, len))
}

fn decode_token<T, C: ValueCodec<T>>(codec: &C, token: &str) -> Result<T> {
    codec.decode_ascii(token).ok_or_else(|| {
        let name = codec.names().first().copied().unwrap_or("value");
        Error::body(format!("invalid {} token '{}'", name, token))
    })
}

/// Scalar column of `T`: one value per row.
pub(crate) struct ScalarColumn<T, C> {
    codec: Arc<C>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C> ScalarColumn<T, C> {
    pub(crate) fn new(codec: Arc<C>) -> Self {
        Self { codec, _marker: PhantomData }
    }
}

impl<T, C> ColumnCodec for ScalarColumn<T, C>
where
    T: Clone + Default + 'static,
    C: ValueCodec<T>,
{
    fn allocate(&self, rows: usize) -> Result<Box<dyn Any>> {
        Ok(Box::new(filled_rows(rows, T::default())?))
    }

    fn max_list_len(&self, _column: &dyn Any) -> Result<usize> {
        Ok(0)
    }

    fn encode_ascii(&self, column: &dyn Any, row: usize, out: &mut String) -> Result<()> {
        let values = column_ref::<Vec<T>>(column)?;
        let value = values.get(row).ok_or_else(|| row_out_of_range(row, values.len()))?;
        self.codec.encode_ascii(value, out);
        Ok(())
    }

    fn decode_ascii(&self, column: &mut dyn Any, row: usize, tokens: &mut dyn TokenSource) -> Result<()> {
        let values = column_mut::<Vec<T>>(column)?;
        let len = values.len();
        let slot = values.get_mut(row).ok_or_else(|| row_out_of_range(row, len))?;
        *slot = decode_token(self.codec.as_ref(), &tokens.next_token()?)?;
        Ok(())
    }

    fn encode_binary(
        &self,
        column: &dyn Any,
        row: usize,
        _index: Option<IndexWidth>,
        endian: Endianness,
        out: &mut dyn Write,
    ) -> Result<()> {
        let values = column_ref::<Vec<T>>(column)?;
        let value = values.get(row).ok_or_else(|| row_out_of_range(row, values.len()))?;
        self.codec.encode_binary(value, endian, out)?;
        Ok(())
    }

    fn decode_binary(
        &self,
        column: &mut dyn Any,
        row: usize,
        _index: Option<IndexWidth>,
        endian: Endianness,
        input: &mut dyn Read,
    ) -> Result<()> {
        let values = column_mut::<Vec<T>>(column)?;
        let len = values.len();
        let slot = values.get_mut(row).ok_or_else(|| row_out_of_range(row, len))?;
        *slot = self.codec.decode_binary(input, endian)?;
        Ok(())
    }
}

/// List column of `T`: a variable-length sequence per row.
pub(crate) struct ListColumn<T, C> {
    codec: Arc<C>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C> ListColumn<T, C> {
    pub(crate) fn new(codec: Arc<C>) -> Self {
        Self { codec, _marker: PhantomData }
    }
}

/// Rows are preallocated up to this many values; longer rows grow as
/// values actually arrive, so a corrupt count cannot reserve gigabytes.
const MAX_PREALLOC: usize = 1 << 16;

impl<T, C> ColumnCodec for ListColumn<T, C>
where
    T: Clone + Default + 'static,
    C: ValueCodec<T>,
{
    fn allocate(&self, rows: usize) -> Result<Box<dyn Any>> {
        Ok(Box::new(filled_rows(rows, Vec::<T>::new())?))
    }

    fn max_list_len(&self, column: &dyn Any) -> Result<usize> {
        let rows = column_ref::<Vec<Vec<T>>>(column)?;
        Ok(rows.iter().map(Vec::len).max().unwrap_or(0))
    }

    fn encode_ascii(&self, column: &dyn Any, row: usize, out: &mut String) -> Result<()> {
        let rows = column_ref::<Vec<Vec<T>>>(column)?;
        let values = rows.get(row).ok_or_else(|| row_out_of_range(row, rows.len()))?;
        out.push_str(&values.len().to_string());
        for value in values {
            out.push(' ');
            self.codec.encode_ascii(value, out);
        }
        Ok(())
    }

    fn decode_ascii(&self, column: &mut dyn Any, row: usize, tokens: &mut dyn TokenSource) -> Result<()> {
        let rows = column_mut::<Vec<Vec<T>>>(column)?;
        let len = rows.len();
        let values = rows.get_mut(row).ok_or_else(|| row_out_of_range(row, len))?;

        let token = tokens.next_token()?;
        let count: usize = token
            .parse()
            .map_err(|_| Error::body(format!("invalid list count '{}'", token)))?;

        values.clear();
        values.reserve(count.min(MAX_PREALLOC));
        for _ in 0..count {
            values.push(decode_token(self.codec.as_ref(), &tokens.next_token()?)?);
        }
        Ok(())
    }

    fn encode_binary(
        &self,
        column: &dyn Any,
        row: usize,
        index: Option<IndexWidth>,
        endian: Endianness,
        out: &mut dyn Write,
    ) -> Result<()> {
        let rows = column_ref::<Vec<Vec<T>>>(column)?;
        let values = rows.get(row).ok_or_else(|| row_out_of_range(row, rows.len()))?;
        let index = index.ok_or_else(|| Error::body("list column written without index width"))?;

        index.write_count(values.len(), endian, out)?;
        for value in values {
            self.codec.encode_binary(value, endian, out)?;
        }
        Ok(())
    }

    fn decode_binary(
        &self,
        column: &mut dyn Any,
        row: usize,
        index: Option<IndexWidth>,
        endian: Endianness,
        input: &mut dyn Read,
    ) -> Result<()> {
        let rows = column_mut::<Vec<Vec<T>>>(column)?;
        let len = rows.len();
        let values = rows.get_mut(row).ok_or_else(|| row_out_of_range(row, len))?;
        let index = index.ok_or_else(|| Error::body("list column read without index width"))?;

        let count = index.read_count(endian, input)?;
        values.clear();
        values.reserve(count.min(MAX_PREALLOC));
        for _ in 0..count {
            values.push(self.codec.decode_binary(input, endian)?);
        }
        Ok(())
    }
}
