//! Utility types and functions for PLY.
//!
//! This module contains fundamental types used throughout the library:
//! - [`ScalarType`] / [`PlyScalar`] - Built-in numeric types and their names
//! - [`Endianness`] / [`ByteSwap`] - Byte order handling
//! - [`OrderedMap`] - Insertion-ordered name lookup
//! - [`Error`] / [`Result`] - Error handling

mod scalar;
mod endian;
mod error;
mod ordered;

pub use scalar::*;
pub use endian::*;
pub use error::*;
pub use ordered::*;
