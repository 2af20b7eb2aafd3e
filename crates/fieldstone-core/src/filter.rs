use crate::predicate::Predicate;
use serde::{Deserialize, Serialize};

///
/// FilterSpec
///
/// Caller-facing filter wire format: a plain `{ mode?, value?, inverted? }`
/// object per filtered path, typically parsed from query-string
/// parameters. The payloads stay opaque JSON until a field type
/// interprets them. Range modes may carry `after`/`before` bounds.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterSpec {
    pub mode: Option<String>,
    pub value: serde_json::Value,
    pub inverted: bool,
    pub after: serde_json::Value,
    pub before: serde_json::Value,
}

impl FilterSpec {
    #[must_use]
    pub fn with_value(value: serde_json::Value) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_mode(mode: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            mode: Some(mode.into()),
            value,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn invert(mut self) -> Self {
        self.inverted = true;
        self
    }

    /// Accepts either a full spec object or a bare scalar/array
    /// shorthand (`{"state": "draft"}`).
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        if json.is_object() {
            serde_json::from_value(json.clone()).unwrap_or_else(|_| Self::with_value(json.clone()))
        } else {
            Self::with_value(json.clone())
        }
    }

    /// Resolve the effective mode: an unknown mode string falls back to
    /// the type's default rather than failing.
    #[must_use]
    pub fn mode_among<'a>(&'a self, known: &[&'a str], default: &'a str) -> &'a str {
        match self.mode.as_deref() {
            None => default,
            Some(mode) if known.contains(&mode) => mode,
            Some(mode) => {
                tracing::warn!(mode, default, "unknown filter mode, using default");
                default
            }
        }
    }

    /// True when no usable value was offered: absent, null, or an empty
    /// string. An explicit empty array is NOT empty in this sense —
    /// select fields give it its own meaning.
    #[must_use]
    pub fn value_is_empty(&self) -> bool {
        match &self.value {
            serde_json::Value::Null => true,
            serde_json::Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    #[must_use]
    pub fn value_text(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Scalar-or-array payload as a flat list of display strings.
    #[must_use]
    pub fn value_texts(&self) -> Vec<String> {
        fn scalar(v: &serde_json::Value) -> Option<String> {
            match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            }
        }

        match &self.value {
            serde_json::Value::Array(items) => items.iter().filter_map(scalar).collect(),
            v => scalar(v).into_iter().collect(),
        }
    }

    /// Apply the inversion flag: the complement of the translated
    /// predicate, never a silent no-op.
    #[must_use]
    pub fn apply_inversion(&self, predicate: Predicate) -> Predicate {
        if self.inverted {
            predicate.not()
        } else {
            predicate
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_scalar_shorthand() {
        let spec = FilterSpec::from_json(&serde_json::json!("draft"));
        assert_eq!(spec.value_text(), Some("draft"));
        assert!(!spec.inverted);
        assert!(spec.mode.is_none());
    }

    #[test]
    fn full_object_form() {
        let spec = FilterSpec::from_json(&serde_json::json!({
            "mode": "exactly",
            "value": "x",
            "inverted": true,
        }));
        assert_eq!(spec.mode.as_deref(), Some("exactly"));
        assert!(spec.inverted);
    }

    #[test]
    fn unknown_mode_falls_back_to_default() {
        let spec = FilterSpec::with_mode("bogus", serde_json::json!("x"));
        assert_eq!(spec.mode_among(&["contains", "exactly"], "contains"), "contains");
        let spec = FilterSpec::with_mode("exactly", serde_json::json!("x"));
        assert_eq!(spec.mode_among(&["contains", "exactly"], "contains"), "exactly");
    }

    #[test]
    fn emptiness_notion() {
        assert!(FilterSpec::default().value_is_empty());
        assert!(FilterSpec::with_value(serde_json::json!("  ")).value_is_empty());
        assert!(!FilterSpec::with_value(serde_json::json!([])).value_is_empty());
        assert!(!FilterSpec::with_value(serde_json::json!(0)).value_is_empty());
    }

    #[test]
    fn value_texts_flattens_scalars() {
        let spec = FilterSpec::with_value(serde_json::json!(["a", 2, true]));
        assert_eq!(spec.value_texts(), vec!["a", "2", "true"]);
    }
}
