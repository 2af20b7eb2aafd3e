//! Module: list
//! Responsibility: the List abstraction — ordered fields, aggregate
//! schema assembly, filters, search, sort, pagination, updates, unique
//! values, export.
//! Does not own: field type behavior (fields), persistence (store).

mod export;
mod paginate;
mod query;
mod unique;
mod update;

pub use paginate::{Page, PaginateOptions};
pub use query::Column;
pub use update::{UpdateData, UpdateOutcome};

use crate::{
    document::Document,
    error::EngineError,
    field::{Field, FieldDef, FieldOptions},
    fields::{Contribution, UnderscoreFn, VirtualFn},
    registry::TypeRegistry,
    schema::{Schema, SchemaPath, ValueKind},
    value::Value,
};
use std::{collections::BTreeMap, sync::Arc};

///
/// TrackOptions
///
/// Automatic tracking fields. Timestamps are plain datetime paths; the
/// by-paths are relationships into `user_list` and are only added when
/// a user list is named.
///

#[derive(Clone, Debug, Default)]
pub struct TrackOptions {
    pub created_at: bool,
    pub created_by: bool,
    pub updated_at: bool,
    pub updated_by: bool,
    pub user_list: Option<String>,
}

impl TrackOptions {
    #[must_use]
    pub fn timestamps() -> Self {
        Self {
            created_at: true,
            updated_at: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn all(user_list: impl Into<String>) -> Self {
        Self {
            created_at: true,
            created_by: true,
            updated_at: true,
            updated_by: true,
            user_list: Some(user_list.into()),
        }
    }

    const fn any(&self) -> bool {
        self.created_at || self.created_by || self.updated_at || self.updated_by
    }
}

impl From<bool> for TrackOptions {
    fn from(flag: bool) -> Self {
        if flag { Self::timestamps() } else { Self::default() }
    }
}

///
/// Mappings
/// Special roles resolved to field paths.
///

#[derive(Clone, Debug, Default)]
pub struct Mappings {
    pub name: Option<String>,
    pub created_by: Option<String>,
    pub created_on: Option<String>,
    pub modified_by: Option<String>,
    pub modified_on: Option<String>,
}

///
/// ListOptions
///

#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    pub label: Option<String>,
    pub hidden: bool,
    pub nocreate: bool,
    pub noedit: bool,
    pub nodelete: bool,
    /// Adds a drag-sort `sort_order` field at registration.
    pub sortable: bool,
    pub track: TrackOptions,
    pub search_fields: Vec<String>,
    pub default_sort: Option<String>,
    pub default_columns: Option<String>,
    pub map: Mappings,
}

///
/// UiElement
/// Admin-form layout entries, in declaration order.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UiElement {
    Heading(String),
    Field(String),
}

///
/// AddItem
/// One argument to `List::add`: a field definition or a heading.
///

#[derive(Clone, Debug)]
pub enum AddItem {
    Heading(String),
    Def(FieldDef),
}

impl From<&str> for AddItem {
    fn from(heading: &str) -> Self {
        Self::Heading(heading.to_string())
    }
}

impl From<FieldDef> for AddItem {
    fn from(def: FieldDef) -> Self {
        Self::Def(def)
    }
}

///
/// RelationshipDef
/// Outgoing reference declared by one field.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationshipDef {
    pub path: String,
    pub target: String,
    pub many: bool,
}

///
/// List
///
/// A named, ordered collection of fields compiled into one schema.
/// Mutable while definitions accumulate; `register` (driven by the
/// engine) finalizes it exactly once.
///

#[derive(Clone)]
pub struct List {
    key: String,
    label: String,
    options: ListOptions,
    ui_elements: Vec<UiElement>,
    schema_fields: Vec<FieldDef>,
    fields: Vec<Field>,
    relationships: BTreeMap<String, RelationshipDef>,
    mappings: Mappings,
    schema: Schema,
    virtuals: BTreeMap<String, VirtualFn>,
    capabilities: BTreeMap<String, BTreeMap<&'static str, UnderscoreFn>>,
    registry: Arc<TypeRegistry>,
    registered: bool,
}

impl std::fmt::Debug for List {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("List")
            .field("key", &self.key)
            .field("fields", &self.fields)
            .field("registered", &self.registered)
            .finish_non_exhaustive()
    }
}

impl List {
    pub(crate) fn new(
        key: impl Into<String>,
        options: ListOptions,
        registry: Arc<TypeRegistry>,
    ) -> Self {
        let key = key.into();
        let label = options
            .label
            .clone()
            .unwrap_or_else(|| crate::field::default_label(&key));
        let mappings = options.map.clone();

        Self {
            key,
            label,
            options,
            ui_elements: Vec::new(),
            schema_fields: Vec::new(),
            fields: Vec::new(),
            relationships: BTreeMap::new(),
            mappings,
            schema: Schema::new(),
            virtuals: BTreeMap::new(),
            capabilities: BTreeMap::new(),
            registry,
            registered: false,
        }
    }

    // --- accessors ---

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn options(&self) -> &ListOptions {
        &self.options
    }

    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.registered
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, path: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.path == path)
    }

    #[must_use]
    pub fn ui_elements(&self) -> &[UiElement] {
        &self.ui_elements
    }

    #[must_use]
    pub const fn relationships(&self) -> &BTreeMap<String, RelationshipDef> {
        &self.relationships
    }

    #[must_use]
    pub const fn mappings(&self) -> &Mappings {
        &self.mappings
    }

    /// Compiled aggregate schema. Empty until registration.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Path of the display-name field (`map.name`, falling back to a
    /// field literally called `name`).
    #[must_use]
    pub fn name_path(&self) -> Option<&str> {
        self.mappings
            .name
            .as_deref()
            .or_else(|| self.field("name").map(|f| f.path.as_str()))
    }

    pub(crate) fn guard_registered(&self) -> Result<(), EngineError> {
        if self.registered {
            Ok(())
        } else {
            Err(EngineError::ListNotRegistered(self.key.clone()))
        }
    }

    // --- definition lifecycle ---

    /// Add field definitions interleaved with headings. Declaration
    /// order is preserved; a duplicate path re-defines the earlier
    /// field in place rather than duplicating it.
    pub fn add(
        &mut self,
        items: impl IntoIterator<Item = AddItem>,
    ) -> Result<&mut Self, EngineError> {
        if self.registered {
            return Err(EngineError::AlreadyRegistered(self.key.clone()));
        }

        for item in items {
            match item {
                AddItem::Heading(heading) => {
                    self.ui_elements.push(UiElement::Heading(heading));
                }
                AddItem::Def(def) => self.add_def(def)?,
            }
        }

        Ok(self)
    }

    fn add_def(&mut self, def: FieldDef) -> Result<(), EngineError> {
        let field = self.registry.build_field(&self.key, &def)?;

        if let Some(reference) = field.kind.reference() {
            self.relationships.insert(
                def.path.clone(),
                RelationshipDef {
                    path: def.path.clone(),
                    target: reference.0.to_string(),
                    many: reference.1,
                },
            );
        }

        if let Some(pos) = self.fields.iter().position(|f| f.path == def.path) {
            // second definition wins, in the original position
            self.fields[pos] = field;
            if let Some(raw) = self.schema_fields.iter_mut().find(|d| d.path == def.path) {
                *raw = def;
            }
        } else {
            self.ui_elements.push(UiElement::Field(def.path.clone()));
            self.fields.push(field);
            self.schema_fields.push(def);
        }

        Ok(())
    }

    /// Re-define one field's options before registration.
    pub fn redefine_field(
        &mut self,
        path: &str,
        options: FieldOptions,
    ) -> Result<(), EngineError> {
        if self.registered {
            return Err(EngineError::AlreadyRegistered(self.key.clone()));
        }

        let type_ref = self
            .schema_fields
            .iter()
            .find(|d| d.path == path)
            .map(|d| d.type_ref.clone())
            .ok_or_else(|| EngineError::UnknownFilterPath {
                list: self.key.clone(),
                path: path.to_string(),
            })?;

        self.add_def(FieldDef {
            path: path.to_string(),
            type_ref,
            options,
        })
    }

    // --- registration (engine-driven) ---

    /// Append tracking and drag-sort fields ahead of finalization.
    pub(crate) fn apply_builtin_fields(&mut self) -> Result<(), EngineError> {
        if self.options.sortable && self.field("sort_order").is_none() {
            self.add_def(FieldDef::new("sort_order", "number").with_options(
                FieldOptions::new().noedit().with("format", serde_json::json!(false)),
            ))?;
        }

        let track = self.options.track.clone();
        if !track.any() {
            return Ok(());
        }

        if track.created_at {
            if self.field("created_at").is_none() {
                self.add_def(
                    FieldDef::new("created_at", "datetime")
                        .with_options(FieldOptions::new().noedit()),
                )?;
            }
            self.mappings.created_on.get_or_insert("created_at".to_string());
        }
        if track.updated_at {
            if self.field("updated_at").is_none() {
                self.add_def(
                    FieldDef::new("updated_at", "datetime")
                        .with_options(FieldOptions::new().noedit()),
                )?;
            }
            self.mappings.modified_on.get_or_insert("updated_at".to_string());
        }

        if let Some(user_list) = track.user_list.clone() {
            if track.created_by {
                if self.field("created_by").is_none() {
                    self.add_def(FieldDef::new("created_by", "relationship").with_options(
                        FieldOptions::new()
                            .noedit()
                            .with("ref", serde_json::json!(user_list.clone())),
                    ))?;
                }
                self.mappings.created_by.get_or_insert("created_by".to_string());
            }
            if track.updated_by {
                if self.field("updated_by").is_none() {
                    self.add_def(FieldDef::new("updated_by", "relationship").with_options(
                        FieldOptions::new()
                            .noedit()
                            .with("ref", serde_json::json!(user_list)),
                    ))?;
                }
                self.mappings.modified_by.get_or_insert("updated_by".to_string());
            }
        } else if track.created_by || track.updated_by {
            tracing::warn!(
                list = %self.key,
                "track.created_by/updated_by need track.user_list; skipped"
            );
        }

        Ok(())
    }

    /// Assemble the aggregate schema, virtual accessors, and capability
    /// table. Called exactly once by the engine.
    pub(crate) fn finalize(&mut self) {
        // the id path is always first
        self.schema.add(SchemaPath::stored(crate::document::ID_PATH, ValueKind::Id));

        for field in &self.fields {
            for contribution in field.contributes() {
                match contribution {
                    Contribution::Stored { path, kind } => {
                        let mut fragment = SchemaPath::stored(path.clone(), kind);
                        if path == field.path {
                            fragment.required =
                                matches!(field.required, crate::field::RequiredSpec::Flag(true));
                            fragment.unique = field.options.unique;
                            fragment.index = field.options.index;
                            fragment.metadata =
                                field.options.passthrough(field.consumed_keys());
                        }
                        self.schema.add(fragment);
                    }
                    Contribution::Virtual { path, get } => {
                        self.schema.add(SchemaPath::virtual_path(path.clone()));
                        self.virtuals.insert(path, get);
                    }
                }
            }

            let methods = field.underscore();
            if !methods.is_empty() {
                let entry = self.capabilities.entry(field.path.clone()).or_default();
                for method in methods {
                    entry.insert(method.name, method.run);
                }
            }
        }

        self.registered = true;
        tracing::debug!(
            list = %self.key,
            fields = self.fields.len(),
            paths = self.schema.len(),
            "list registered"
        );
    }

    // --- document access ---

    /// Read a path through the schema: virtual accessors first, then
    /// the owning field's (possibly reshaping) data read, then raw.
    #[must_use]
    pub fn read(&self, item: &Document, path: &str) -> Value {
        if let Some(get) = self.virtuals.get(path) {
            return get(item);
        }
        if let Some(field) = self.field(path) {
            return field.get_data(item);
        }

        item.get(path).clone()
    }

    /// Display string for one path on one document.
    #[must_use]
    pub fn format(&self, item: &Document, path: &str) -> String {
        self.field(path)
            .map_or_else(|| self.read(item, path).to_string(), |f| f.format(item))
    }

    /// Invoke a contributed per-field document operation.
    pub fn call(
        &self,
        item: &Document,
        path: &str,
        op: &str,
        args: &[Value],
    ) -> Result<Value, EngineError> {
        let run = self
            .capabilities
            .get(path)
            .and_then(|ops| ops.get(op))
            .ok_or_else(|| EngineError::UnknownOperation {
                path: path.to_string(),
                op: op.to_string(),
            })?;

        run(item, args)
    }

    /// The document's display name, via the name mapping.
    #[must_use]
    pub fn display_name(&self, item: &Document) -> String {
        self.name_path()
            .map_or_else(String::new, |path| self.format(item, path))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;

    fn list() -> List {
        List::new(
            "Post",
            ListOptions::default(),
            Arc::new(TypeRegistry::builtin()),
        )
    }

    #[test]
    fn add_preserves_declaration_order_with_headings() {
        let mut list = list();
        list.add([
            AddItem::from("Content"),
            AddItem::from(FieldDef::new("title", "text")),
            AddItem::from(FieldDef::new("body", "textarea")),
            AddItem::from("Meta"),
            AddItem::from(FieldDef::new("published", "boolean")),
        ])
        .unwrap();

        assert_eq!(
            list.ui_elements(),
            &[
                UiElement::Heading("Content".to_string()),
                UiElement::Field("title".to_string()),
                UiElement::Field("body".to_string()),
                UiElement::Heading("Meta".to_string()),
                UiElement::Field("published".to_string()),
            ]
        );
        assert_eq!(list.fields().len(), 3);
    }

    #[test]
    fn duplicate_path_redefines_second_wins() {
        let mut list = list();
        list.add([
            AddItem::from(
                FieldDef::new("title", "text")
                    .with_options(FieldOptions::new().with("max", serde_json::json!(10))),
            ),
            AddItem::from(FieldDef::new("body", "textarea")),
            AddItem::from(
                FieldDef::new("title", "text")
                    .with_options(FieldOptions::new().with("max", serde_json::json!(80))),
            ),
        ])
        .unwrap();

        assert_eq!(list.fields().len(), 2);
        // original position kept
        assert_eq!(list.fields()[0].path, "title");
        assert_eq!(list.fields()[0].options.extra_u64("max"), Some(80));
        // one ui element per field
        let field_elements = list
            .ui_elements()
            .iter()
            .filter(|e| matches!(e, UiElement::Field(p) if p == "title"))
            .count();
        assert_eq!(field_elements, 1);
    }

    #[test]
    fn redefine_field_before_registration_only() {
        let mut list = list();
        list.add([AddItem::from(FieldDef::new("title", "text"))]).unwrap();

        list.redefine_field("title", FieldOptions::new().required()).unwrap();
        assert!(matches!(
            list.field("title").unwrap().required,
            crate::field::RequiredSpec::Flag(true)
        ));

        list.finalize();
        assert!(matches!(
            list.redefine_field("title", FieldOptions::new()),
            Err(EngineError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn unknown_type_fails_fast() {
        let mut list = list();
        let err = list
            .add([AddItem::from(FieldDef::new("x", "slider"))])
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownFieldType { .. }));
    }

    #[test]
    fn finalize_assembles_schema_without_duplicates() {
        let mut list = list();
        list.add([
            AddItem::from(FieldDef::new("title", "text")),
            AddItem::from(FieldDef::new("title", "text")),
            AddItem::from(
                FieldDef::new("state", "select")
                    .with_options(FieldOptions::new().with(
                        "options",
                        serde_json::json!("draft, published"),
                    )),
            ),
        ])
        .unwrap();
        list.finalize();

        // id + title + state + state_label
        assert_eq!(list.schema().len(), 4);
        assert!(list.schema().get("state_label").is_some());
        assert!(list.is_registered());
    }

    #[test]
    fn no_add_after_registration() {
        let mut list = list();
        list.finalize();
        let err = list
            .add([AddItem::from(FieldDef::new("x", "text"))])
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyRegistered(_)));
    }

    #[test]
    fn virtual_read_and_capability_dispatch() {
        let mut list = list();
        list.add([
            AddItem::from(FieldDef::new("title", "text")),
            AddItem::from(FieldDef::new("state", "select").with_options(
                FieldOptions::new().with(
                    "options",
                    serde_json::json!([{"value": "draft", "label": "Draft"}]),
                ),
            )),
        ])
        .unwrap();
        list.finalize();

        let mut doc = Document::new();
        doc.set("state", "draft");
        doc.set("title", "a quick brown fox");

        assert_eq!(list.read(&doc, "state_label"), Value::Text("Draft".into()));
        let cropped = list
            .call(&doc, "title", "crop", &[Value::Int(7), Value::Text("…".into()), Value::Bool(true)])
            .unwrap();
        assert_eq!(cropped, Value::Text("a quick…".into()));

        assert!(matches!(
            list.call(&doc, "title", "nope", &[]),
            Err(EngineError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn tracking_fields_added_once() {
        let mut list = List::new(
            "Post",
            ListOptions {
                track: TrackOptions::timestamps(),
                sortable: true,
                ..ListOptions::default()
            },
            Arc::new(TypeRegistry::builtin()),
        );
        list.add([AddItem::from(FieldDef::new("title", "text"))])
            .unwrap();
        list.apply_builtin_fields().unwrap();
        list.finalize();

        assert!(list.field("created_at").is_some());
        assert!(list.field("updated_at").is_some());
        assert!(list.field("sort_order").is_some());
        assert_eq!(list.mappings().created_on.as_deref(), Some("created_at"));
    }
}
