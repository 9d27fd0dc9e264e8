//! Elements - named row groups holding properties of equal length.

use std::fmt;
use std::sync::Arc;

use super::property::Property;
use super::registry::{TypeKey, TypeRegistry};
use crate::util::{Error, OrderedMap, Result};

/// Named row group (e.g. `vertex`, `face`) with a fixed row count.
pub struct Element {
    name: String,
    rows: usize,
    properties: OrderedMap<Property>,
    types: Arc<TypeRegistry>,
}

impl Element {
    pub(crate) fn new(name: impl Into<String>, rows: usize, types: Arc<TypeRegistry>) -> Self {
        Self {
            name: name.into(),
            rows,
            properties: OrderedMap::new(),
            types,
        }
    }

    /// Name of this element.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows, fixed at creation.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Registry used for eager binding.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub(crate) fn set_types(&mut self, types: Arc<TypeRegistry>) {
        self.types = types;
    }

    /// Get or create a property. New properties are unbound and go last.
    pub fn property(&mut self, name: &str) -> &mut Property {
        let rows = self.rows;
        self.properties.get_or_insert_with(name, || Property::new(name, rows))
    }

    /// Get or create a property bound to `key`.
    ///
    /// Fails with `UnknownType` if `key` is not registered, with
    /// `TypeMismatch` if the property already holds another type and with
    /// `TooManyRows` if its buffer cannot be reserved. A property created by
    /// a failed call is not kept.
    pub fn property_typed(&mut self, name: &str, key: TypeKey) -> Result<&mut Property> {
        let descriptor = self.types.lookup(key)?;
        let codec = Arc::clone(descriptor.codec());
        let rows = self.rows;

        let existed = self.properties.contains_key(name);
        if let Err(e) = self.property(name).bind(key, || codec.allocate(rows)) {
            if !existed {
                self.properties.remove(name);
            }
            return Err(e);
        }
        self.get_mut(name)
    }

    /// Existing property by name.
    pub fn get(&self, name: &str) -> Result<&Property> {
        self.properties
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("property '{}' in element '{}'", name, self.name)))
    }

    /// Existing property by name, mutable.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Property> {
        let element = &self.name;
        self.properties
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(format!("property '{}' in element '{}'", name, element)))
    }

    /// Returns true if a property with `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Delete a property; it disappears from iteration and header output.
    pub fn remove_property(&mut self, name: &str) -> Result<Property> {
        self.properties
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("property '{}' in element '{}'", name, self.name)))
    }

    /// Properties in insertion order.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    /// Mutable properties in insertion order.
    pub fn properties_mut(&mut self) -> impl Iterator<Item = &mut Property> {
        self.properties.values_mut()
    }

    /// Number of properties.
    pub fn num_properties(&self) -> usize {
        self.properties.len()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name)
            .field("rows", &self.rows)
            .field("properties", &self.properties.values().collect::<Vec<_>>())
            .finish()
    }
}
