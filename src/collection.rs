//! Ordered, name-unique containers
//!
//! [`Collection`] keeps items in insertion order and looks them up by their
//! *current* name through an index that is rebuilt lazily. Names are read
//! from the items on demand because they may be derived from a mutable
//! descriptor (an atom site is named after its label), so a cached slot is
//! always re-checked before it is trusted.

use std::cell::RefCell;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur when working with collections
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectionError {
    #[error("No item named '{name}'")]
    NotFound { name: String },

    #[error("Name '{name}' is already taken")]
    NameTaken { name: String },
}

/// Anything stored in a [`Collection`]
pub trait Keyed {
    /// Current name of the item
    fn key(&self) -> String;
}

#[derive(Debug)]
pub struct Collection<T> {
    items: Vec<T>,
    index: RefCell<HashMap<String, usize>>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: RefCell::new(HashMap::new()),
        }
    }
}

impl<T: Keyed> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, replacing any item with the same current name
    ///
    /// # Returns
    ///
    /// The replaced item, if there was one
    pub fn add(&mut self, item: T) -> Option<T> {
        let key = item.key();
        match self.position(&key) {
            Some(pos) => Some(std::mem::replace(&mut self.items[pos], item)),
            None => {
                self.items.push(item);
                self.index.borrow_mut().insert(key, self.items.len() - 1);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.position(name).map(|pos| &self.items[pos])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.position(name).map(move |pos| &mut self.items[pos])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove the item with the given name
    ///
    /// # Returns
    ///
    /// The removed item, or [`CollectionError::NotFound`] if absent
    pub fn remove(&mut self, name: &str) -> Result<T, CollectionError> {
        let pos = self.position(name).ok_or_else(|| CollectionError::NotFound {
            name: name.to_string(),
        })?;
        let item = self.items.remove(pos);
        self.index.borrow_mut().clear();
        Ok(item)
    }

    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(Keyed::key).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        if let Some(pos) = self.cached(name) {
            return Some(pos);
        }
        self.rebuild_index();
        self.cached(name)
    }

    fn cached(&self, name: &str) -> Option<usize> {
        let pos = *self.index.borrow().get(name)?;
        let item = self.items.get(pos)?;
        (item.key() == name).then_some(pos)
    }

    fn rebuild_index(&self) {
        let mut index = self.index.borrow_mut();
        index.clear();
        for (pos, item) in self.items.iter().enumerate() {
            // first occurrence wins if two items were renamed onto one name
            index.entry(item.key()).or_insert(pos);
        }
    }
}

impl<'a, T: Keyed> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[derive(Debug)]
    struct Item {
        name: Rc<RefCell<String>>,
        value: i32,
    }

    impl Item {
        fn new(name: &str, value: i32) -> Self {
            Self {
                name: Rc::new(RefCell::new(name.to_string())),
                value,
            }
        }
    }

    impl Keyed for Item {
        fn key(&self) -> String {
            self.name.borrow().clone()
        }
    }

    #[test]
    fn test_add_and_get() {
        let mut c = Collection::new();
        c.add(Item::new("La", 1));
        c.add(Item::new("Ba", 2));

        assert_eq!(c.get("La").unwrap().value, 1);
        assert_eq!(c.get("Ba").unwrap().value, 2);
        assert!(c.get("Co").is_none());
        assert_eq!(c.names(), vec!["La", "Ba"]);
    }

    #[test]
    fn test_add_replaces_same_name() {
        let mut c = Collection::new();
        c.add(Item::new("La", 1));
        c.add(Item::new("Ba", 2));
        let old = c.add(Item::new("La", 3));

        assert_eq!(old.unwrap().value, 1);
        assert_eq!(c.len(), 2);
        assert_eq!(c.get("La").unwrap().value, 3);
        assert_eq!(c.names(), vec!["La", "Ba"]);
    }

    #[test]
    fn test_remove() {
        let mut c = Collection::new();
        c.add(Item::new("La", 1));
        c.add(Item::new("Ba", 2));
        c.add(Item::new("Co", 3));

        assert_eq!(c.remove("Ba").unwrap().value, 2);
        assert_eq!(c.len(), 2);
        assert_eq!(c.get("Co").unwrap().value, 3);
        assert_eq!(
            c.remove("Ba").unwrap_err(),
            CollectionError::NotFound {
                name: "Ba".to_string()
            }
        );
    }

    #[test]
    fn test_lookup_follows_rename() {
        let mut c = Collection::new();
        let item = Item::new("La", 1);
        let name = Rc::clone(&item.name);
        c.add(item);
        assert!(c.contains("La"));

        *name.borrow_mut() = "Sr".to_string();
        assert!(c.get("La").is_none());
        assert_eq!(c.get("Sr").unwrap().value, 1);

        // adding under the new name replaces rather than duplicates
        c.add(Item::new("Sr", 5));
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("Sr").unwrap().value, 5);
    }

    #[test]
    fn test_len_counts_distinct_names() {
        let mut c = Collection::new();
        for (i, name) in ["a", "b", "a", "c", "b"].iter().enumerate() {
            c.add(Item::new(name, i as i32));
        }
        c.remove("c").unwrap();
        assert_eq!(c.len(), 2);
    }
}
