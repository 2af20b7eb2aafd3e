use crate::{
    document::Document,
    fields::{Contribution, FieldKind, UnderscoreMethod},
    filter::FilterSpec,
    predicate::Predicate,
    registry::TypeRef,
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

///
/// RequiredSpec
///
/// Static requirement flag, or a deferred predicate: the field is
/// required only when every named dependency path holds a truthy value
/// on the document under validation.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequiredSpec {
    Flag(bool),
    Paths(Vec<String>),
}

impl RequiredSpec {
    #[must_use]
    pub fn evaluate(&self, item: &Document) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Paths(paths) => paths.iter().all(|p| item.get(p).truthy()),
        }
    }
}

impl Default for RequiredSpec {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl From<bool> for RequiredSpec {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

///
/// FieldOptions
///
/// The closed set of interpreted configuration keys plus an open
/// extension bag for type-specific keys (`min`/`max`, `options`, `ref`,
/// …). Keys neither the engine nor the field type interprets are
/// forwarded verbatim into the compiled schema's per-path metadata.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FieldOptions {
    pub label: Option<String>,
    pub required: RequiredSpec,
    pub unique: bool,
    pub index: bool,
    pub initial: bool,
    pub noedit: bool,
    pub hidden: bool,
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
    pub default: Option<serde_json::Value>,
    pub depends_on: Option<serde_json::Value>,
    pub size: Option<String>,
    /// Space-separated paths; when any of them appears in an update,
    /// this field re-derives its value from `default`.
    pub watch: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FieldOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- builders ---

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = RequiredSpec::Flag(true);
        self
    }

    #[must_use]
    pub fn required_when(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required = RequiredSpec::Paths(paths.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    #[must_use]
    pub fn initial(mut self) -> Self {
        self.initial = true;
        self
    }

    #[must_use]
    pub fn noedit(mut self) -> Self {
        self.noedit = true;
        self
    }

    #[must_use]
    pub fn default_json(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Type-specific or passthrough key in the extension bag.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    // --- extension-bag readers used by type constructors ---

    #[must_use]
    pub fn extra_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    #[must_use]
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(serde_json::Value::as_str)
    }

    #[must_use]
    pub fn extra_bool(&self, key: &str) -> Option<bool> {
        self.extra.get(key).and_then(serde_json::Value::as_bool)
    }

    #[must_use]
    pub fn extra_u64(&self, key: &str) -> Option<u64> {
        self.extra.get(key).and_then(serde_json::Value::as_u64)
    }

    #[must_use]
    pub fn extra_i64(&self, key: &str) -> Option<i64> {
        self.extra.get(key).and_then(serde_json::Value::as_i64)
    }

    #[must_use]
    pub fn extra_f64(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(serde_json::Value::as_f64)
    }

    /// Extension-bag keys minus the ones the field type consumed:
    /// this is the verbatim metadata forwarded into the schema.
    #[must_use]
    pub fn passthrough(
        &self,
        consumed: &[&str],
    ) -> serde_json::Map<String, serde_json::Value> {
        self.extra
            .iter()
            .filter(|(k, _)| !consumed.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

///
/// FieldDef
/// A raw field definition as handed to `List::add`.
///

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub path: String,
    pub type_ref: TypeRef,
    pub options: FieldOptions,
}

impl FieldDef {
    pub fn new(path: impl Into<String>, type_ref: impl Into<TypeRef>) -> Self {
        Self {
            path: path.into(),
            type_ref: type_ref.into(),
            options: FieldOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: FieldOptions) -> Self {
        self.options = options;
        self
    }
}

///
/// Field
///
/// The polymorphic unit: owns its options and delegates codec,
/// validation, and filter translation to its type's kind. Created
/// exactly once when `List::add` processes a definition; immutable
/// afterwards except for a pre-registration redefinition.
///

#[derive(Clone, Debug)]
pub struct Field {
    pub list_key: String,
    pub path: String,
    pub type_id: String,
    pub label: String,
    pub options: FieldOptions,
    pub required: RequiredSpec,
    pub(crate) kind: Arc<dyn FieldKind>,
}

impl Field {
    /// True when this field is required for the given document.
    #[must_use]
    pub fn is_required(&self, item: &Document) -> bool {
        self.required.evaluate(item)
    }

    #[must_use]
    pub fn validate_input(&self, data: &Value) -> bool {
        self.kind.validate_input(data)
    }

    #[must_use]
    pub fn validate_required_input(&self, item: &Document, data: Option<&Value>) -> bool {
        // virtual fields hold no stored value to check
        if self.options.is_virtual {
            return true;
        }

        self.kind.validate_required_input(item, data)
    }

    pub fn update_item(&self, item: &mut Document, data: &Value) {
        self.kind.update_item(item, data);
    }

    #[must_use]
    pub fn format(&self, item: &Document) -> String {
        self.kind.format(item)
    }

    /// `None` when the type is not filterable (the list turns that into
    /// a no-op condition).
    #[must_use]
    pub fn filter(&self, spec: &FilterSpec) -> Option<Predicate> {
        self.kind.filter(spec)
    }

    #[must_use]
    pub fn get_data(&self, item: &Document) -> Value {
        self.kind.get_data(item)
    }

    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        // an explicit declared default wins over the type's own
        self.options
            .default
            .as_ref()
            .map(Value::from_json)
            .or_else(|| self.kind.default_value())
    }

    #[must_use]
    pub fn contributes(&self) -> Vec<Contribution> {
        if self.options.is_virtual {
            return Vec::new();
        }

        self.kind.contributes()
    }

    #[must_use]
    pub fn underscore(&self) -> Vec<UnderscoreMethod> {
        self.kind.underscore()
    }

    #[must_use]
    pub fn consumed_keys(&self) -> &'static [&'static str] {
        self.kind.consumed_keys()
    }

    /// Watched paths parsed from the `watch` option.
    #[must_use]
    pub fn watched_paths(&self) -> Vec<&str> {
        self.options
            .watch
            .as_deref()
            .map(|w| w.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Human label derived from a path: `created_at` → `Created At`.
#[must_use]
pub fn default_label(path: &str) -> String {
    path.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_spec_defers_to_dependency_paths() {
        let spec = RequiredSpec::Paths(vec!["published".to_string()]);
        let mut doc = Document::new();
        assert!(!spec.evaluate(&doc));
        doc.set("published", true);
        assert!(spec.evaluate(&doc));
    }

    #[test]
    fn options_deserialize_with_extension_bag() {
        let options: FieldOptions = serde_json::from_value(serde_json::json!({
            "label": "Title",
            "required": true,
            "max": 80,
            "note": "shown in admin"
        }))
        .unwrap();

        assert_eq!(options.label.as_deref(), Some("Title"));
        assert_eq!(options.required, RequiredSpec::Flag(true));
        assert_eq!(options.extra_u64("max"), Some(80));

        let passthrough = options.passthrough(&["min", "max"]);
        assert!(passthrough.contains_key("note"));
        assert!(!passthrough.contains_key("max"));
    }

    #[test]
    fn label_derivation() {
        assert_eq!(default_label("created_at"), "Created At");
        assert_eq!(default_label("title"), "Title");
    }
}
