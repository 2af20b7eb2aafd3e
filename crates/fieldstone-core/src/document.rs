use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;
use ulid::Ulid;

const NULL: Value = Value::Null;

/// Reserved path holding the document identifier.
pub const ID_PATH: &str = "id";

///
/// Document
///
/// A flat `path → Value` record. Dotted keys carry values populated from
/// a related document (`author.name`); the engine itself never nests.
///

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Document {
    values: BTreeMap<String, Value>,
}

impl Document {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Read a path. Absent paths read as `Null`.
    #[must_use]
    pub fn get(&self, path: &str) -> &Value {
        self.values.get(path).unwrap_or(&NULL)
    }

    /// Write a path. Writing `Null` clears the stored entry so that
    /// absent and null stay indistinguishable.
    pub fn set(&mut self, path: impl Into<String>, value: impl Into<Value>) {
        let path = path.into();
        let value = value.into();
        if value.is_null() {
            self.values.remove(&path);
        } else {
            self.values.insert(path, value);
        }
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        self.values.remove(path)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.values.contains_key(path)
    }

    #[must_use]
    pub fn id(&self) -> Option<Ulid> {
        self.get(ID_PATH).as_id()
    }

    pub fn set_id(&mut self, id: Ulid) {
        self.set(ID_PATH, Value::Id(id));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keep only the named paths (plus the id). Used by column
    /// projection in the in-memory backend.
    #[must_use]
    pub fn project(&self, paths: &[String]) -> Self {
        let mut out = Self::new();
        for (k, v) in &self.values {
            if k == ID_PATH || paths.iter().any(|p| p == k) {
                out.values.insert(k.clone(), v.clone());
            }
        }

        out
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Self::new();
        for (path, value) in iter {
            doc.set(path, value);
        }
        doc
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_paths_read_null() {
        let doc = Document::new();
        assert_eq!(doc.get("title"), &Value::Null);
    }

    #[test]
    fn writing_null_clears_the_entry() {
        let mut doc = Document::new();
        doc.set("title", "hello");
        doc.set("title", Value::Null);
        assert!(!doc.contains("title"));
        assert!(doc.is_empty());
    }

    #[test]
    fn projection_keeps_id() {
        let mut doc = Document::new();
        doc.set_id(Ulid::from_parts(1, 1));
        doc.set("a", 1);
        doc.set("b", 2);
        let projected = doc.project(&["a".to_string()]);
        assert!(projected.contains("a"));
        assert!(projected.contains(ID_PATH));
        assert!(!projected.contains("b"));
    }
}
