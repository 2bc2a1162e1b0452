#![forbid(unsafe_code)]

//! The owned form-data graph.
//!
//! One [`Store`] holds the entire tree for a form. Fields never keep a
//! private copy of their value as source of truth; they own a [`Path`] and
//! read/write through the store. Writes that leave the stored value deeply
//! equal are suppressed, so change notification can key off the return of
//! [`Store::set`].

use serde_json::{Map, Value};

use crate::path::Path;

/// The single shared, mutable form-data tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    root: Value,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// An empty store (root object with no entries).
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Wrap an existing value tree.
    #[must_use]
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// The whole tree.
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Read the node at `path`, if bound.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Value> {
        let mut node = &self.root;
        for segment in path.segments() {
            node = match node {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Write `value` at `path`, creating intermediate nodes as needed.
    ///
    /// A numeric segment creates/extends an array (padding with `null`);
    /// any other segment creates an object entry. Returns `false` when the
    /// stored value was already deeply equal — callers use this to suppress
    /// notifications for no-op writes.
    pub fn set(&mut self, path: &Path, value: Value) -> bool {
        if path.is_empty() {
            if self.root == value {
                return false;
            }
            self.root = value;
            return true;
        }
        if self.get(path) == Some(&value) {
            return false;
        }

        let mut node = &mut self.root;
        let segments = path.segments();
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            let index = segment.parse::<usize>().ok();
            match index {
                Some(idx) => {
                    if !node.is_array() {
                        *node = Value::Array(Vec::new());
                    }
                    let items = node.as_array_mut().expect("just coerced to array");
                    while items.len() <= idx {
                        items.push(Value::Null);
                    }
                    if last {
                        items[idx] = value;
                        return true;
                    }
                    node = &mut items[idx];
                }
                None => {
                    if !node.is_object() {
                        *node = Value::Object(Map::new());
                    }
                    let map = node.as_object_mut().expect("just coerced to object");
                    if last {
                        map.insert(segment.clone(), value);
                        return true;
                    }
                    node = map.entry(segment.clone()).or_insert(Value::Null);
                }
            }
        }
        unreachable!("non-empty path always terminates on its last segment")
    }

    /// Remove the node at `path`, returning the old value.
    ///
    /// Removing an array element shifts later elements down, matching how a
    /// repeated row disappears from a list.
    pub fn remove(&mut self, path: &Path) -> Option<Value> {
        let last = path.last()?.to_string();
        let parent = path.parent();
        let node = self.get_mut(&parent)?;
        match node {
            Value::Object(map) => map.remove(&last),
            Value::Array(items) => {
                let idx = last.parse::<usize>().ok()?;
                if idx < items.len() {
                    Some(items.remove(idx))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Reset to an empty root object.
    pub fn clear(&mut self) {
        self.root = Value::Object(Map::new());
    }

    fn get_mut(&mut self, path: &Path) -> Option<&mut Value> {
        let mut node = &mut self.root;
        for segment in path.segments() {
            node = match node {
                Value::Object(map) => map.get_mut(segment)?,
                Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }
}
