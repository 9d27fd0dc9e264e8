//! Properties - typed columns with late type binding.
//!
//! A property starts out unbound. The first typed access (or an explicit
//! type from a header) binds it for good and allocates a zero-valued buffer
//! with one entry per row of the owning element.

use std::any::Any;
use std::fmt;

use super::codec::{filled_rows, IndexWidth};
use super::registry::TypeKey;
use crate::util::{Error, Result};

/// Binding state of a property.
enum Binding {
    Unbound,
    Bound { key: TypeKey, data: Box<dyn Any> },
}

/// One named column of an element.
pub struct Property {
    name: String,
    rows: usize,
    binding: Binding,
    read_index: Option<IndexWidth>,
}

impl Property {
    pub(crate) fn new(name: impl Into<String>, rows: usize) -> Self {
        Self {
            name: name.into(),
            rows,
            binding: Binding::Unbound,
            read_index: None,
        }
    }

    /// Name of this property.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows (always the owning element's row count).
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns true once a type has been assigned.
    #[inline]
    pub fn is_bound(&self) -> bool {
        matches!(self.binding, Binding::Bound { .. })
    }

    /// Full bound type: list-of-T for list properties, T otherwise.
    pub fn list_type(&self) -> Result<TypeKey> {
        match &self.binding {
            Binding::Bound { key, .. } => Ok(*key),
            Binding::Unbound => Err(Error::NotBound(self.name.clone())),
        }
    }

    /// Per-value type T, for scalar and list properties alike.
    pub fn value_type(&self) -> Result<TypeKey> {
        self.list_type().map(|key| key.value_type())
    }

    /// Returns true for list properties.
    pub fn is_list(&self) -> Result<bool> {
        self.list_type().map(|key| key.is_list())
    }

    /// List count width declared by the header of the last file read.
    ///
    /// Writing picks its own width from the data and ignores this.
    #[inline]
    pub fn read_index_width(&self) -> Option<IndexWidth> {
        self.read_index
    }

    pub(crate) fn set_read_index_width(&mut self, width: Option<IndexWidth>) {
        self.read_index = width;
    }

    /// Bind to `key` if unbound, allocating with `allocate`.
    ///
    /// Binding the same key again is a no-op. A failed allocation leaves the
    /// property unbound.
    pub(crate) fn bind(&mut self, key: TypeKey, allocate: impl FnOnce() -> Result<Box<dyn Any>>) -> Result<()> {
        match &self.binding {
            Binding::Unbound => {
                self.binding = Binding::Bound { key, data: allocate()? };
                Ok(())
            }
            Binding::Bound { key: bound, .. } if *bound == key => Ok(()),
            Binding::Bound { key: bound, .. } => Err(Error::TypeMismatch {
                expected: key.to_string(),
                actual: bound.to_string(),
            }),
        }
    }

    /// Bound type and type-erased buffer.
    pub(crate) fn column(&self) -> Result<(TypeKey, &dyn Any)> {
        match &self.binding {
            Binding::Bound { key, data } => Ok((*key, data.as_ref())),
            Binding::Unbound => Err(Error::NotBound(self.name.clone())),
        }
    }

    /// Bound type and mutable type-erased buffer.
    pub(crate) fn column_mut(&mut self) -> Result<(TypeKey, &mut dyn Any)> {
        match &mut self.binding {
            Binding::Bound { key, data } => Ok((*key, data.as_mut())),
            Binding::Unbound => Err(Error::NotBound(self.name.clone())),
        }
    }

    fn typed<C: 'static>(&self, key: TypeKey) -> Result<&C> {
        let (bound, data) = self.column()?;
        data.downcast_ref::<C>().filter(|_| bound == key).ok_or_else(|| Error::TypeMismatch {
            expected: key.to_string(),
            actual: bound.to_string(),
        })
    }

    fn typed_mut<C: 'static>(&mut self, key: TypeKey) -> Result<&mut C> {
        let (bound, data) = self.column_mut()?;
        if bound != key {
            return Err(Error::TypeMismatch { expected: key.to_string(), actual: bound.to_string() });
        }
        data.downcast_mut::<C>().ok_or_else(|| Error::TypeMismatch {
            expected: key.to_string(),
            actual: bound.to_string(),
        })
    }

    // === Scalar access ===

    /// Bind to scalar `T` on first use and return the values.
    ///
    /// A fresh binding yields `rows()` default (zero) values.
    pub fn bind_and_get<T: Clone + Default + 'static>(&mut self) -> Result<&mut [T]> {
        let key = TypeKey::scalar::<T>();
        let rows = self.rows;
        self.bind(key, || {
            let data: Box<dyn Any> = Box::new(filled_rows(rows, T::default())?);
            Ok(data)
        })?;
        self.typed_mut::<Vec<T>>(key).map(Vec::as_mut_slice)
    }

    /// Scalar values of an already bound property.
    pub fn values<T: 'static>(&self) -> Result<&[T]> {
        self.typed::<Vec<T>>(TypeKey::scalar::<T>()).map(Vec::as_slice)
    }

    /// Copy `values` in, binding to scalar `T` if needed.
    pub fn set<T: Clone + Default + 'static>(&mut self, values: &[T]) -> Result<()> {
        if values.len() != self.rows {
            return Err(Error::LengthMismatch { expected: self.rows, actual: values.len() });
        }
        self.bind_and_get::<T>()?.clone_from_slice(values);
        Ok(())
    }

    // === List access ===

    /// Bind to list-of-`T` on first use and return the rows.
    ///
    /// A fresh binding yields `rows()` empty sequences.
    pub fn bind_and_get_lists<T: Clone + Default + 'static>(&mut self) -> Result<&mut [Vec<T>]> {
        let key = TypeKey::list::<T>();
        let rows = self.rows;
        self.bind(key, || {
            let data: Box<dyn Any> = Box::new(filled_rows(rows, Vec::<T>::new())?);
            Ok(data)
        })?;
        self.typed_mut::<Vec<Vec<T>>>(key).map(Vec::as_mut_slice)
    }

    /// List rows of an already bound property.
    pub fn lists<T: 'static>(&self) -> Result<&[Vec<T>]> {
        self.typed::<Vec<Vec<T>>>(TypeKey::list::<T>()).map(Vec::as_slice)
    }

    /// Copy `rows` in, binding to list-of-`T` if needed.
    pub fn set_lists<T: Clone + Default + 'static>(&mut self, rows: &[Vec<T>]) -> Result<()> {
        if rows.len() != self.rows {
            return Err(Error::LengthMismatch { expected: self.rows, actual: rows.len() });
        }
        self.bind_and_get_lists::<T>()?.clone_from_slice(rows);
        Ok(())
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ty = match &self.binding {
            Binding::Bound { key, .. } => key.to_string(),
            Binding::Unbound => "unbound".to_string(),
        };
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("rows", &self.rows)
            .field("type", &ty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_binding() {
        let mut p = Property::new("x", 3);
        assert!(!p.is_bound());
        assert!(matches!(p.is_list(), Err(Error::NotBound(_))));
        assert!(matches!(p.list_type(), Err(Error::NotBound(_))));

        let values = p.bind_and_get::<f32>().unwrap();
        assert_eq!(values, &[0.0, 0.0, 0.0]);
        values[1] = 2.5;

        assert!(p.is_bound());
        assert!(!p.is_list().unwrap());
        assert_eq!(p.value_type().unwrap(), TypeKey::scalar::<f32>());
        assert_eq!(p.values::<f32>().unwrap(), &[0.0, 2.5, 0.0]);
    }

    #[test]
    fn test_rebinding_fails() {
        let mut p = Property::new("x", 2);
        p.bind_and_get::<f32>().unwrap();
        let err = p.bind_and_get::<i32>().unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(matches!(p.bind_and_get_lists::<f32>(), Err(Error::TypeMismatch { .. })));
        assert!(matches!(p.values::<f64>(), Err(Error::TypeMismatch { .. })));
        // Same type again is fine and keeps the data.
        p.bind_and_get::<f32>().unwrap()[0] = 1.0;
        assert_eq!(p.bind_and_get::<f32>().unwrap()[0], 1.0);
    }

    #[test]
    fn test_list_binding() {
        let mut p = Property::new("vertex_indices", 2);
        let rows = p.bind_and_get_lists::<i32>().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(Vec::is_empty));
        rows[0].extend([0, 1, 2]);

        assert!(p.is_list().unwrap());
        assert_eq!(p.list_type().unwrap(), TypeKey::list::<i32>());
        assert_eq!(p.value_type().unwrap(), TypeKey::scalar::<i32>());
        assert_eq!(p.lists::<i32>().unwrap()[0], vec![0, 1, 2]);
        assert!(matches!(p.values::<i32>(), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_set_length_mismatch() {
        let mut p = Property::new("x", 3);
        let err = p.set(&[1.0f32, 2.0]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 3, actual: 2 }));
        // A rejected set must not bind.
        assert!(!p.is_bound());

        p.set(&[1.0f32, 2.0, 3.0]).unwrap();
        assert_eq!(p.values::<f32>().unwrap(), &[1.0, 2.0, 3.0]);

        let mut l = Property::new("l", 1);
        assert!(matches!(
            l.set_lists::<u8>(&[vec![1], vec![2]]),
            Err(Error::LengthMismatch { expected: 1, actual: 2 })
        ));
        l.set_lists(&[vec![1u8, 2]]).unwrap();
        assert_eq!(l.lists::<u8>().unwrap(), &[vec![1, 2]]);
    }

    #[test]
    fn test_oversized_binding_stays_unbound() {
        let mut p = Property::new("x", usize::MAX);
        assert!(matches!(p.bind_and_get::<f64>(), Err(Error::TooManyRows(_))));
        assert!(!p.is_bound());
        assert!(matches!(p.bind_and_get_lists::<u8>(), Err(Error::TooManyRows(_))));
        assert!(!p.is_bound());
    }

    #[test]
    fn test_unbound_views() {
        let p = Property::new("x", 1);
        assert!(matches!(p.values::<f32>(), Err(Error::NotBound(ref n)) if n == "x"));
        assert!(matches!(p.lists::<f32>(), Err(Error::NotBound(_))));
    }
}
