//! Core layer - the typed column store.
//!
//! This module provides:
//! - [`TypeRegistry`] - Type identities, header names and codecs
//! - [`ValueCodec`] / [`ColumnCodec`] - Per-type ASCII and binary encoding
//! - [`Property`] - One late-bound column
//! - [`Element`] - Insertion-ordered properties sharing a row count

mod codec;
mod registry;
mod property;
mod element;

pub use codec::{ColumnCodec, IndexWidth, NumericCodec, TokenSource, ValueCodec};
pub use registry::{TypeDescriptor, TypeKey, TypeRegistry};
pub use property::Property;
pub use element::Element;
