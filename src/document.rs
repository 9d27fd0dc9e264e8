//! The in-memory PLY document.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use crate::core::{Element, TypeRegistry, ValueCodec};
use crate::format::{read_document, write_document, Format, LineTerminator, ReadOptions};
use crate::util::{Endianness, Error, OrderedMap, Result};

/// Elements, header metadata and the type registry of one PLY file.
///
/// # Example
///
/// ```ignore
/// use plyfile::{Document, Endianness, Format};
///
/// let mut doc = Document::new();
/// let vertex = doc.add_element("vertex", 3);
/// vertex.property("x").set(&[0.0f32, 1.0, 2.0])?;
/// doc.write_path("points.ply", Format::Binary, Endianness::Little)?;
/// ```
pub struct Document {
    elements: OrderedMap<Element>,
    comments: Vec<String>,
    obj_info: Vec<String>,
    types: Arc<TypeRegistry>,
    line_terminator: LineTerminator,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with the built-in numeric types registered.
    pub fn new() -> Self {
        Self {
            elements: OrderedMap::new(),
            comments: Vec::new(),
            obj_info: Vec::new(),
            types: Arc::new(TypeRegistry::new()),
            line_terminator: LineTerminator::default(),
        }
    }

    // === Elements ===

    /// Get or create an element.
    ///
    /// If `name` already exists the existing element is returned and `rows`
    /// is ignored.
    pub fn add_element(&mut self, name: &str, rows: usize) -> &mut Element {
        let types = &self.types;
        self.elements
            .get_or_insert_with(name, || Element::new(name, rows, Arc::clone(types)))
    }

    /// Existing element by name.
    pub fn element(&self, name: &str) -> Result<&Element> {
        self.elements
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("element '{}'", name)))
    }

    /// Existing element by name, mutable.
    pub fn element_mut(&mut self, name: &str) -> Result<&mut Element> {
        self.elements
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(format!("element '{}'", name)))
    }

    pub fn contains_element(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    /// Delete an element together with its properties.
    pub fn remove_element(&mut self, name: &str) -> Result<Element> {
        self.elements
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("element '{}'", name)))
    }

    /// Elements in insertion order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Mutable elements in insertion order.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.elements.values_mut()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    // === Header metadata ===

    /// Comment lines, without the `comment` keyword.
    ///
    /// Lines are trimmed when read, so trailing whitespace in a comment does
    /// not survive a write/read cycle. Whitespace after the one separating
    /// space is kept.
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn comments_mut(&mut self) -> &mut Vec<String> {
        &mut self.comments
    }

    pub fn add_comment(&mut self, text: impl Into<String>) {
        self.comments.push(text.into());
    }

    /// `obj_info` lines, without the keyword. Trimmed like [`Self::comments`].
    pub fn obj_info(&self) -> &[String] {
        &self.obj_info
    }

    pub fn obj_info_mut(&mut self) -> &mut Vec<String> {
        &mut self.obj_info
    }

    // === Types ===

    /// Registered property types.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Register a user type `T` (scalar and list forms) with its codec.
    ///
    /// Existing elements see the new type immediately.
    pub fn register_type<T, C>(&mut self, codec: C) -> Result<()>
    where
        T: Clone + Default + 'static,
        C: ValueCodec<T>,
    {
        Arc::make_mut(&mut self.types).register::<T, C>(codec)?;
        for element in self.elements.values_mut() {
            element.set_types(Arc::clone(&self.types));
        }
        Ok(())
    }

    // === Line terminator ===

    /// Terminator used for header and ASCII body lines on write.
    pub fn line_terminator(&self) -> LineTerminator {
        self.line_terminator
    }

    /// Set the terminator, returning the previous one.
    pub fn set_line_terminator(&mut self, terminator: LineTerminator) -> LineTerminator {
        std::mem::replace(&mut self.line_terminator, terminator)
    }

    /// Drop all elements, comments and obj_info lines.
    ///
    /// Registered types and the line terminator are kept.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.comments.clear();
        self.obj_info.clear();
    }

    // === I/O ===

    /// Replace the contents with a PLY stream, using default options.
    pub fn read<R: Read>(&mut self, source: R) -> Result<()> {
        self.read_with(source, ReadOptions::default())
    }

    /// Replace the contents with a PLY stream.
    ///
    /// On error the document is left cleared or partially populated.
    pub fn read_with<R: Read>(&mut self, source: R, options: ReadOptions) -> Result<()> {
        tracing::debug!("reading document ({:?})", options);
        read_document(self, BufReader::new(source), options)
    }

    /// Replace the contents with the file at `path`.
    pub fn read_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tracing::debug!("reading {}", path.display());
        let file = File::open(path)?;
        self.read(file)
    }

    /// Serialize to `target`. `endian` only matters for binary bodies.
    pub fn write<W: Write>(&self, target: W, format: Format, endian: Endianness) -> Result<()> {
        tracing::debug!("writing document ({:?}, {})", format, endian);
        let mut out = BufWriter::new(target);
        write_document(self, &mut out, format, endian)?;
        out.flush()?;
        Ok(())
    }

    /// Create (or truncate) the file at `path` and write to it.
    pub fn write_path(&self, path: impl AsRef<Path>, format: Format, endian: Endianness) -> Result<()> {
        let path = path.as_ref();
        tracing::debug!("writing {}", path.display());
        let file = File::create(path)?;
        self.write(file, format, endian)
    }

    /// ASCII rendering of the whole document, for inspection.
    pub fn to_text(&self) -> Result<String> {
        let mut out = Vec::new();
        write_document(self, &mut out, Format::Ascii, Endianness::native())?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("elements", &self.elements.values().collect::<Vec<_>>())
            .field("comments", &self.comments)
            .field("obj_info", &self.obj_info)
            .field("line_terminator", &self.line_terminator)
            .finish()
    }
}
