//! Name-keyed resource registry
//!
//! A [`Registry`] deduplicates datablocks by name and hands out dense ids in
//! first-seen order. One registry exists per resource kind for the lifetime
//! of a single export. Entries borrow the scene; nothing is copied.

use std::collections::HashMap;

use bxporter_core::{Error, Result};
use bxporter_scene::{Named, Object};

use crate::animation::Track;

/// A registered datablock
#[derive(Debug)]
pub struct Entry<'a, T> {
    /// Key the entry was registered under
    pub key: String,
    /// The datablock itself
    pub data: &'a T,
    /// Dense id, equal to the insertion position
    pub id: usize,
    /// Objects using this datablock, in registration order
    pub users: Vec<&'a Object>,
    /// Flattened animation, if any
    pub tracks: Option<Vec<Track>>,
}

impl<'a, T> Entry<'a, T> {
    /// Id as written to fixed-schema records
    pub fn id_i32(&self) -> i32 {
        self.id as i32
    }

    /// Tracks attached to this entry, empty when none
    pub fn tracks(&self) -> &[Track] {
        self.tracks.as_deref().unwrap_or(&[])
    }
}

/// Deduplicating id-assigning map for one resource kind
#[derive(Debug)]
pub struct Registry<'a, T> {
    /// Entries in id order
    entries: Vec<Entry<'a, T>>,
    /// Key to entry index mapping
    index: HashMap<String, usize>,
}

impl<'a, T> Registry<'a, T> {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register `data` under an explicit key
    ///
    /// Returns `false` without touching the registry when the key is
    /// already present.
    pub fn insert_with_key(&mut self, key: impl Into<String>, data: &'a T) -> bool {
        let key = key.into();
        if self.index.contains_key(&key) {
            return false;
        }

        let id = self.entries.len();
        self.index.insert(key.clone(), id);
        self.entries.push(Entry {
            key,
            data,
            id,
            users: Vec::new(),
            tracks: None,
        });
        true
    }

    /// Find an entry by key
    pub fn lookup(&self, key: &str) -> Option<&Entry<'a, T>> {
        self.index.get(key).map(|&idx| &self.entries[idx])
    }

    /// Find an entry by key for modification
    pub fn lookup_mut(&mut self, key: &str) -> Option<&mut Entry<'a, T>> {
        match self.index.get(key) {
            Some(&idx) => self.entries.get_mut(idx),
            None => None,
        }
    }

    /// Find an entry by key, failing with `ReferenceNotFound`
    pub fn require(&self, kind: &'static str, key: &str) -> Result<&Entry<'a, T>> {
        self.lookup(key).ok_or_else(|| Error::not_found(kind, key))
    }

    /// Find an entry by id
    pub fn get(&self, id: usize) -> Option<&Entry<'a, T>> {
        self.entries.get(id)
    }

    /// Id of the entry registered under `key`
    pub fn id_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Check if a key is registered
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Get entry count
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in id order
    pub fn iter(&self) -> std::slice::Iter<'_, Entry<'a, T>> {
        self.entries.iter()
    }

    /// Record `user` as a user of the entry under `key`
    ///
    /// Returns `false` when no such entry exists.
    pub fn add_user(&mut self, key: &str, user: &'a Object) -> bool {
        match self.lookup_mut(key) {
            Some(entry) => {
                entry.users.push(user);
                true
            }
            None => false,
        }
    }

    /// Attach flattened tracks to the entry under `key`
    ///
    /// Returns `false` when no such entry exists.
    pub fn set_tracks(&mut self, key: &str, tracks: Vec<Track>) -> bool {
        match self.lookup_mut(key) {
            Some(entry) => {
                entry.tracks = Some(tracks);
                true
            }
            None => false,
        }
    }
}

impl<'a, T: Named> Registry<'a, T> {
    /// Register `data` under its own name
    pub fn insert(&mut self, data: &'a T) -> bool {
        self.insert_with_key(data.name(), data)
    }
}

impl<'a, T> Default for Registry<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r, 'a, T> IntoIterator for &'r Registry<'a, T> {
    type Item = &'r Entry<'a, T>;
    type IntoIter = std::slice::Iter<'r, Entry<'a, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bxporter_scene::{Mesh, ObjectData};

    #[test]
    fn test_insert_assigns_dense_ids() {
        let a = Mesh::new("A");
        let b = Mesh::new("B");
        let mut registry = Registry::new();

        assert!(registry.insert(&a));
        assert!(registry.insert(&b));
        assert!(!registry.insert(&a));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("A").unwrap().id, 0);
        assert_eq!(registry.lookup("B").unwrap().id, 1);
        assert_eq!(registry.id_of("C"), None);
    }

    #[test]
    fn test_first_insertion_wins() {
        let first = Mesh::new("Shared");
        let mut second = Mesh::new("Shared");
        second.materials.push(None);

        let mut registry = Registry::new();
        registry.insert(&first);
        registry.insert(&second);

        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("Shared").unwrap().data.materials.is_empty());
    }

    #[test]
    fn test_explicit_key() {
        let mesh = Mesh::new("Data");
        let mut registry = Registry::new();

        assert!(registry.insert_with_key("alias", &mesh));
        assert!(registry.lookup("Data").is_none());
        assert_eq!(registry.lookup("alias").unwrap().key, "alias");
    }

    #[test]
    fn test_users_and_tracks() {
        let mesh = Mesh::new("Cube");
        let one = Object::new("One", ObjectData::Mesh("Cube".into()));
        let two = Object::new("Two", ObjectData::Mesh("Cube".into()));

        let mut registry = Registry::new();
        registry.insert(&mesh);
        assert!(registry.add_user("Cube", &one));
        assert!(registry.add_user("Cube", &two));
        assert!(!registry.add_user("Sphere", &one));

        let entry = registry.lookup("Cube").unwrap();
        let names: Vec<&str> = entry.users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["One", "Two"]);
        assert!(entry.tracks().is_empty());

        assert!(registry.set_tracks("Cube", Vec::new()));
        assert!(registry.lookup("Cube").unwrap().tracks.is_some());
    }

    #[test]
    fn test_require_reports_kind() {
        let registry: Registry<'_, Mesh> = Registry::new();
        let err = registry.require("Mesh", "Missing").unwrap_err();
        assert!(err.is_reference_not_found());
    }

    #[test]
    fn test_iter_in_id_order() {
        let meshes: Vec<Mesh> = ["C", "A", "B"].iter().map(|n| Mesh::new(*n)).collect();
        let mut registry = Registry::new();
        for mesh in &meshes {
            registry.insert(mesh);
        }

        let keys: Vec<(usize, &str)> = registry.iter().map(|e| (e.id, e.key.as_str())).collect();
        assert_eq!(keys, vec![(0, "C"), (1, "A"), (2, "B")]);
    }
}
