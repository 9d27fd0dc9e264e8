//! Type registry - maps type identities to descriptors and column codecs.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smallvec::SmallVec;

use super::codec::{ColumnCodec, ListColumn, NumericCodec, ScalarColumn, ValueCodec};
use crate::util::{Error, PlyScalar, Result};

/// Identity of a property type: a Rust value type, scalar or list.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    list: bool,
    rust_name: &'static str,
}

impl TypeKey {
    /// One `T` per row.
    pub fn scalar<T: Any>() -> Self {
        Self { id: TypeId::of::<T>(), list: false, rust_name: std::any::type_name::<T>() }
    }

    /// A variable-length sequence of `T` per row.
    pub fn list<T: Any>() -> Self {
        Self { id: TypeId::of::<T>(), list: true, rust_name: std::any::type_name::<T>() }
    }

    /// Returns true for list types.
    #[inline]
    pub fn is_list(&self) -> bool {
        self.list
    }

    /// The per-value type: `T` for both scalar-T and list-of-T.
    #[inline]
    pub fn value_type(&self) -> Self {
        Self { list: false, ..*self }
    }

    /// The list-of-T counterpart.
    #[inline]
    pub fn as_list(&self) -> Self {
        Self { list: true, ..*self }
    }

    /// Returns true if this key is the scalar or list form of `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.list == other.list
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.list.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.list {
            write!(f, "list<{}>", self.rust_name)
        } else {
            write!(f, "{}", self.rust_name)
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything the reader and writer need to know about one property type.
#[derive(Clone)]
pub struct TypeDescriptor {
    key: TypeKey,
    byte_width: usize,
    names: SmallVec<[String; 2]>,
    codec: Arc<dyn ColumnCodec>,
}

impl TypeDescriptor {
    /// Type identity this descriptor serves.
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Returns true for list types.
    #[inline]
    pub fn is_list(&self) -> bool {
        self.key.list
    }

    /// Binary size of one value (list elements for list types).
    #[inline]
    pub fn byte_width(&self) -> usize {
        self.byte_width
    }

    /// Accepted header names, first is written.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Header name used when writing.
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    /// Returns true if `name` is one of the accepted header names.
    pub fn accepts(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Column codec for this type.
    pub fn codec(&self) -> &Arc<dyn ColumnCodec> {
        &self.codec
    }

    /// Zero-valued column buffer for `rows` rows.
    pub fn allocate(&self, rows: usize) -> Result<Box<dyn Any>> {
        self.codec.allocate(rows)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("key", &self.key)
            .field("byte_width", &self.byte_width)
            .field("names", &self.names)
            .finish()
    }
}

/// Registered property types.
///
/// Registration always installs a pair: scalar-T and list-of-T share the
/// value codec and the header names.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    descriptors: Vec<TypeDescriptor>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Registry pre-loaded with the PLY 1.0 numeric types.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.insert_numeric::<i8>();
        registry.insert_numeric::<u8>();
        registry.insert_numeric::<i16>();
        registry.insert_numeric::<u16>();
        registry.insert_numeric::<i32>();
        registry.insert_numeric::<u32>();
        registry.insert_numeric::<f32>();
        registry.insert_numeric::<f64>();
        registry
    }

    /// Registry without any types.
    pub fn empty() -> Self {
        Self { descriptors: Vec::new() }
    }

    fn insert_numeric<T: PlyScalar>(&mut self) {
        self.insert_pair::<T, NumericCodec>(NumericCodec);
    }

    fn insert_pair<T, C>(&mut self, codec: C)
    where
        T: Clone + Default + 'static,
        C: ValueCodec<T>,
    {
        let names: SmallVec<[String; 2]> = codec.names().iter().map(|n| n.to_string()).collect();
        let byte_width = codec.byte_width();
        let codec = Arc::new(codec);

        self.descriptors.push(TypeDescriptor {
            key: TypeKey::scalar::<T>(),
            byte_width,
            names: names.clone(),
            codec: Arc::new(ScalarColumn::<T, C>::new(Arc::clone(&codec))),
        });
        self.descriptors.push(TypeDescriptor {
            key: TypeKey::list::<T>(),
            byte_width,
            names,
            codec: Arc::new(ListColumn::<T, C>::new(codec)),
        });
    }

    /// Register scalar-T and list-of-T with `codec`.
    ///
    /// Fails if `T` is already registered, if the codec offers no header
    /// name, or if one of its names is claimed by another type.
    pub fn register<T, C>(&mut self, codec: C) -> Result<()>
    where
        T: Clone + Default + 'static,
        C: ValueCodec<T>,
    {
        let key = TypeKey::scalar::<T>();
        if self.contains(key) {
            return Err(Error::DuplicateType(key.to_string()));
        }
        if codec.names().is_empty() {
            return Err(Error::UnknownType(format!("{} has no header name", key)));
        }
        if let Some(name) = codec.names().iter().find(|n| self.resolve_by_name(n, false).is_some()) {
            return Err(Error::DuplicateTypeName(name.to_string()));
        }

        self.insert_pair::<T, C>(codec);
        tracing::debug!("registered type {} as '{}'", key, codec_name(self, key));
        Ok(())
    }

    /// Returns true if `key` is registered.
    pub fn contains(&self, key: TypeKey) -> bool {
        self.descriptors.iter().any(|d| d.key == key)
    }

    /// Descriptor for `key`.
    pub fn lookup(&self, key: TypeKey) -> Result<&TypeDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.key == key)
            .ok_or_else(|| Error::UnknownType(key.to_string()))
    }

    /// First descriptor (in registration order) accepting header name `name`.
    pub fn resolve_by_name(&self, name: &str, is_list: bool) -> Option<&TypeDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.key.list == is_list && d.accepts(name))
    }

    /// All descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.descriptors.iter()
    }
}

fn codec_name(registry: &TypeRegistry, key: TypeKey) -> String {
    registry.lookup(key).map(|d| d.name().to_string()).unwrap_or_default()
}
