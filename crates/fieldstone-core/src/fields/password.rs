use crate::{
    document::Document,
    error::EngineError,
    fields::{FieldContext, FieldKind, UnderscoreMethod},
    schema::ValueKind,
    value::Value,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use time::OffsetDateTime;

///
/// PasswordKind
///
/// Stores a SHA-256 hex digest, never the cleartext. Display is a
/// masked placeholder whose length varies and carries no relationship
/// to the stored or original length. Blank offered input leaves the
/// existing digest untouched — an empty form field is not a reset.
/// Not filterable.
///

#[derive(Clone, Debug)]
pub struct PasswordKind {
    path: String,
}

impl PasswordKind {
    pub(crate) fn build(ctx: &FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError> {
        Ok(Arc::new(Self {
            path: ctx.path.to_string(),
        }))
    }

    fn digest(cleartext: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(cleartext.as_bytes());
        let out = hasher.finalize();
        out.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl FieldKind for PasswordKind {
    fn type_id(&self) -> &'static str {
        "password"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn validate_input(&self, data: &Value) -> bool {
        matches!(data, Value::Null | Value::Text(_))
    }

    fn update_item(&self, item: &mut Document, data: &Value) {
        match data.as_text() {
            Some(cleartext) if !cleartext.is_empty() => {
                item.set(&self.path, Value::Text(Self::digest(cleartext)));
            }
            // blank input keeps the existing digest
            _ => {}
        }
    }

    fn format(&self, item: &Document) -> String {
        if item.get(&self.path).is_missing() {
            return String::new();
        }

        // mask length varies with the clock, never with the content
        let jitter = (OffsetDateTime::now_utc().nanosecond() % 6) as usize;
        "•".repeat(6 + jitter)
    }

    fn underscore(&self) -> Vec<UnderscoreMethod> {
        let path = self.path.clone();

        vec![UnderscoreMethod::new("compare", move |doc, args| {
            let candidate = args.first().and_then(Value::as_text).unwrap_or_default();
            let stored = doc.get(&path).as_text().unwrap_or_default();
            Ok(Value::Bool(
                !stored.is_empty() && PasswordKind::digest(candidate) == stored,
            ))
        })]
    }
}

///
/// TESTS
///
