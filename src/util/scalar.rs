//! Built-in scalar types - the numeric types every PLY document understands.

use bytemuck::{Pod, Zeroable};
use std::fmt;

use super::ByteSwap;

/// Built-in scalar type enum.
///
/// These are the PLY 1.0 numeric types. Each has a fixed size and a
/// well-defined binary representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ScalarType {
    /// Signed 8-bit integer
    Int8 = 0,
    /// Unsigned 8-bit integer
    Uint8 = 1,
    /// Signed 16-bit integer
    Int16 = 2,
    /// Unsigned 16-bit integer
    Uint16 = 3,
    /// Signed 32-bit integer
    Int32 = 4,
    /// Unsigned 32-bit integer
    Uint32 = 5,
    /// 32-bit floating point (IEEE 754 single precision)
    Float32 = 6,
    /// 64-bit floating point (IEEE 754 double precision)
    Float64 = 7,
}

impl ScalarType {
    /// All built-in types in registration order.
    pub const ALL: [ScalarType; 8] = [
        Self::Int8,
        Self::Uint8,
        Self::Int16,
        Self::Uint16,
        Self::Int32,
        Self::Uint32,
        Self::Float32,
        Self::Float64,
    ];

    /// Returns the size in bytes of a single value of this type.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Header names accepted for this type. The first one is written.
    #[inline]
    pub const fn names(self) -> &'static [&'static str] {
        match self {
            Self::Int8 => &["char", "int8"],
            Self::Uint8 => &["uchar", "uint8"],
            Self::Int16 => &["short", "int16"],
            Self::Uint16 => &["ushort", "uint16"],
            Self::Int32 => &["int", "int32"],
            Self::Uint32 => &["uint", "uint32"],
            Self::Float32 => &["float", "float32"],
            Self::Float64 => &["double", "float64"],
        }
    }

    /// Returns the name written into headers.
    #[inline]
    pub const fn name(self) -> &'static str {
        self.names()[0]
    }

    /// Parse a type from any of its header names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.names().contains(&name))
    }

    /// Returns true if this is a floating point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// === Scalar trait for type-safe conversions ===

/// Trait for the built-in numeric value types.
pub trait PlyScalar: Pod + Zeroable + ByteSwap + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The corresponding ScalarType enum value.
    const SCALAR_TYPE: ScalarType;

    /// Append the ASCII representation of `self`.
    fn format_ascii(&self, out: &mut String);

    /// Parse an ASCII token.
    fn parse_ascii(token: &str) -> Option<Self>;
}

macro_rules! impl_scalar_int {
    ($($t:ty => $variant:ident),*) => {
        $(impl PlyScalar for $t {
            const SCALAR_TYPE: ScalarType = ScalarType::$variant;

            #[inline]
            fn format_ascii(&self, out: &mut String) {
                use std::fmt::Write;
                let _ = write!(out, "{}", self);
            }

            #[inline]
            fn parse_ascii(token: &str) -> Option<Self> {
                token.parse().ok()
            }
        })*
    };
}

impl_scalar_int!(
    i8 => Int8, u8 => Uint8, i16 => Int16, u16 => Uint16, i32 => Int32, u32 => Uint32
);

impl PlyScalar for f32 {
    const SCALAR_TYPE: ScalarType = ScalarType::Float32;

    #[inline]
    fn format_ascii(&self, out: &mut String) {
        format_general(*self as f64, 9, out);
    }

    #[inline]
    fn parse_ascii(token: &str) -> Option<Self> {
        token.parse().ok()
    }
}

impl PlyScalar for f64 {
    const SCALAR_TYPE: ScalarType = ScalarType::Float64;

    #[inline]
    fn format_ascii(&self, out: &mut String) {
        format_general(*self, 17, out);
    }

    #[inline]
    fn parse_ascii(token: &str) -> Option<Self> {
        token.parse().ok()
    }
}

/// Format a float with `precision` significant digits in `%g` layout:
/// fixed notation for moderate exponents, scientific otherwise, trailing
/// zeros removed.
pub fn format_general(value: f64, precision: usize, out: &mut String) {
    if value.is_nan() {
        out.push_str("nan");
        return;
    }
    if value.is_infinite() {
        out.push_str(if value < 0.0 { "-inf" } else { "inf" });
        return;
    }
    if value == 0.0 {
        out.push_str(if value.is_sign_negative() { "-0" } else { "0" });
        return;
    }

    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        out.push_str(&sci);
        return;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= precision as i32 {
        out.push_str(trim_fraction(mantissa));
        out.push('e');
        out.push(if exp < 0 { '-' } else { '+' });
        out.push_str(&format!("{:02}", exp.unsigned_abs()));
    } else {
        let decimals = (precision as i32 - 1 - exp) as usize;
        let fixed = format!("{:.*}", decimals, value);
        out.push_str(trim_fraction(&fixed));
    }
}

/// Strip trailing zeros (and a dangling point) from a decimal string.
fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
