//! Insertion-ordered string map.
//!
//! Elements and properties are few per document, so lookups scan a single
//! vector. Keeping names and values in one sequence means removal updates
//! lookup and emission order together.

/// Map from names to values that iterates in insertion order.
#[derive(Clone, Debug)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<V> OrderedMap<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Get a value by name.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Get a mutable value by name.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Check if a name exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Return the existing value for `key`, or append one built by `make`.
    pub fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let idx = match self.position(key) {
            Some(idx) => idx,
            None => {
                self.entries.push((key.to_string(), make()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    /// Remove a name and return its value, preserving the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.position(key).map(|pos| self.entries.remove(pos).1)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over name/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Iterate mutably over values in insertion order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order() {
        let mut map = OrderedMap::new();
        *map.get_or_insert_with("z", || 0) = 1;
        *map.get_or_insert_with("a", || 0) = 2;
        *map.get_or_insert_with("m", || 0) = 3;
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_existing_entry_kept() {
        let mut map = OrderedMap::new();
        map.get_or_insert_with("x", || 10);
        let v = map.get_or_insert_with("x", || 20);
        assert_eq!(*v, 10);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut map = OrderedMap::new();
        map.get_or_insert_with("a", || 1);
        map.get_or_insert_with("b", || 2);
        map.get_or_insert_with("c", || 3);
        assert_eq!(map.remove("b"), Some(2));
        assert_eq!(map.remove("b"), None);
        assert!(!map.contains_key("b"));
        let vals: Vec<i32> = map.values().copied().collect();
        assert_eq!(vals, [1, 3]);
    }
}
