use serde::Serialize;

///
/// ValueKind
/// Scalar shape hint a stored path declares to the backend.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
    Id,
    List,
}

///
/// PathKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum PathKind {
    Stored(ValueKind),
    Virtual,
}

///
/// SchemaPath
///
/// One compiled schema fragment. `metadata` carries every field option
/// the owning type did not interpret, verbatim, so downstream consumers
/// (an admin UI, a migration tool) can read it back.
///

#[derive(Clone, Debug, Serialize)]
pub struct SchemaPath {
    pub path: String,
    pub kind: PathKind,
    pub required: bool,
    pub unique: bool,
    pub index: bool,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SchemaPath {
    #[must_use]
    pub fn stored(path: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            path: path.into(),
            kind: PathKind::Stored(kind),
            required: false,
            unique: false,
            index: false,
            metadata: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn virtual_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: PathKind::Virtual,
            required: false,
            unique: false,
            index: false,
            metadata: serde_json::Map::new(),
        }
    }
}

///
/// Schema
///
/// Ordered aggregate of path fragments. Insertion order is the order
/// fields contributed them; duplicate paths replace in place so that a
/// re-registered fragment can never double up.
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct Schema {
    paths: Vec<SchemaPath>,
}

impl Schema {
    #[must_use]
    pub const fn new() -> Self {
        Self { paths: Vec::new() }
    }

    pub fn add(&mut self, fragment: SchemaPath) {
        if let Some(existing) = self.paths.iter_mut().find(|p| p.path == fragment.path) {
            *existing = fragment;
        } else {
            self.paths.push(fragment);
        }
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&SchemaPath> {
        self.paths.iter().find(|p| p.path == path)
    }

    #[must_use]
    pub fn paths(&self) -> &[SchemaPath] {
        &self.paths
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_paths_replace_in_place() {
        let mut schema = Schema::new();
        schema.add(SchemaPath::stored("title", ValueKind::Text));
        schema.add(SchemaPath::stored("count", ValueKind::Int));

        let mut redefined = SchemaPath::stored("title", ValueKind::Text);
        redefined.required = true;
        schema.add(redefined);

        assert_eq!(schema.len(), 2);
        assert!(schema.get("title").unwrap().required);
        // order preserved: title stayed first
        assert_eq!(schema.paths()[0].path, "title");
    }
}
