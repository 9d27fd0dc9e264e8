//! # plyfile
//!
//! Reader and writer for the PLY polygon file format (Stanford triangle
//! format), version 1.0, in ASCII and both binary byte orders.
//!
//! A document is a list of named elements (`vertex`, `face`, ...). Each
//! element has a fixed row count and an ordered set of properties; each
//! property is a column holding either one value or a variable-length list
//! of values per row. Property types are bound late: a property created by
//! name takes the type of the first typed access, while properties read
//! from a file are bound to the type named in its header.
//!
//! ## Modules
//!
//! - [`util`] - Scalar types, byte order, errors
//! - [`core`] - Type registry, codecs, properties and elements
//! - [`format`] - Header grammar, line handling, body reader/writer
//!
//! ## Example
//!
//! ```ignore
//! use plyfile::prelude::*;
//!
//! let mut doc = Document::new();
//! doc.read_path("bunny.ply")?;
//!
//! let vertex = doc.element("vertex")?;
//! let x = vertex.get("x")?.values::<f32>()?;
//! println!("{} vertices, first x = {}", vertex.rows(), x[0]);
//!
//! doc.write_path("bunny_le.ply", Format::Binary, Endianness::Little)?;
//! ```

pub mod util;
pub mod core;
pub mod format;
mod document;

// Re-export commonly used types
pub use crate::document::Document;
pub use crate::util::{Endianness, Error, Result, ScalarType};
pub use crate::core::{Element, Property, TypeKey, TypeRegistry, ValueCodec};
pub use crate::format::{Format, LineTerminator, ReadOptions};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{Element, IndexWidth, Property, TypeKey, ValueCodec};
    pub use crate::format::{Format, LineTerminator, ReadOptions};
    pub use crate::util::{Endianness, Error, Result};
    pub use crate::Document;
}
