//! Byte order handling for binary bodies.

use std::fmt;

/// Byte order of a binary body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the running platform.
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    /// True when values must be swapped to go between native and `self`.
    #[inline]
    pub const fn needs_swap(self) -> bool {
        !matches!(
            (self, Self::native()),
            (Self::Little, Self::Little) | (Self::Big, Self::Big)
        )
    }
}

impl Default for Endianness {
    fn default() -> Self {
        Self::native()
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Little => write!(f, "little-endian"),
            Self::Big => write!(f, "big-endian"),
        }
    }
}

/// Reverses the byte order of a fixed-width value.
pub trait ByteSwap: Copy {
    fn byte_swap(self) -> Self;

    /// Swap only when `endian` differs from the platform order.
    #[inline]
    fn to_order(self, endian: Endianness) -> Self {
        if endian.needs_swap() {
            self.byte_swap()
        } else {
            self
        }
    }
}

macro_rules! impl_swap_int {
    ($($t:ty),*) => {
        $(impl ByteSwap for $t {
            #[inline]
            fn byte_swap(self) -> Self {
                self.swap_bytes()
            }
        })*
    };
}

impl_swap_int!(i8, u8, i16, u16, i32, u32, i64, u64);

impl ByteSwap for f32 {
    #[inline]
    fn byte_swap(self) -> Self {
        f32::from_bits(self.to_bits().swap_bytes())
    }
}

impl ByteSwap for f64 {
    #[inline]
    fn byte_swap(self) -> Self {
        f64::from_bits(self.to_bits().swap_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_needs_no_swap() {
        assert!(!Endianness::native().needs_swap());
        let other = match Endianness::native() {
            Endianness::Little => Endianness::Big,
            Endianness::Big => Endianness::Little,
        };
        assert!(other.needs_swap());
    }

    #[test]
    fn test_swap_values() {
        assert_eq!(0x1234u16.byte_swap(), 0x3412);
        assert_eq!(0x0102_0304i32.byte_swap(), 0x0403_0201);
        assert_eq!(7u8.byte_swap(), 7);
        let f = 1.5f32;
        assert_eq!(f.byte_swap().byte_swap(), f);
        assert_eq!(f.byte_swap().to_bits(), f.to_bits().swap_bytes());
    }

    #[test]
    fn test_to_order_matches_std() {
        let v = 0xA1B2_C3D4u32;
        assert_eq!(v.to_order(Endianness::Little).to_ne_bytes(), v.to_le_bytes());
        assert_eq!(v.to_order(Endianness::Big).to_ne_bytes(), v.to_be_bytes());
    }
}
