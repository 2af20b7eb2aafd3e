use crate::{
    document::Document,
    error::EngineError,
    fields::{FieldContext, FieldKind},
    filter::FilterSpec,
    predicate::Predicate,
    schema::ValueKind,
    value::Value,
};
use std::sync::Arc;

///
/// BooleanKind
///
/// Accepts booleans, numeric 0/1, and the literal strings "true"/"false"
/// (any case) as valid input. Any other non-empty offered value still
/// counts as present for required checks and coerces to `true` on
/// update — a checked box is a checked box.
///

#[derive(Clone, Debug)]
pub struct BooleanKind {
    path: String,
    default: Option<bool>,
}

impl BooleanKind {
    pub(crate) fn build(ctx: &FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError> {
        Ok(Arc::new(Self {
            path: ctx.path.to_string(),
            default: ctx
                .options
                .default
                .as_ref()
                .and_then(serde_json::Value::as_bool),
        }))
    }

    fn coerce(data: &Value) -> Option<bool> {
        match data {
            Value::Null => None,
            Value::Bool(b) => Some(*b),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            Value::Float(f) if *f == 0.0 => Some(false),
            Value::Float(f) if *f == 1.0 => Some(true),
            Value::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    // present but not a recognized literal
                    None
                }
            }
            _ => None,
        }
    }
}

impl FieldKind for BooleanKind {
    fn type_id(&self) -> &'static str {
        "boolean"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Bool
    }

    fn default_value(&self) -> Option<Value> {
        self.default.map(Value::Bool)
    }

    fn validate_input(&self, data: &Value) -> bool {
        match data {
            Value::Null => true,
            Value::Text(s) if s.trim().is_empty() => true,
            other => Self::coerce(other).is_some(),
        }
    }

    fn validate_required_input(&self, item: &Document, data: Option<&Value>) -> bool {
        // any non-empty offered value counts as present
        match data {
            Some(v) if !v.is_missing() => true,
            _ => !item.get(&self.path).is_missing(),
        }
    }

    fn update_item(&self, item: &mut Document, data: &Value) {
        let value = match Self::coerce(data) {
            Some(b) => Value::Bool(b),
            // unrecognized but present coerces to true; absent clears
            None if !data.is_missing() => Value::Bool(true),
            None => Value::Null,
        };
        item.set(&self.path, value);
    }

    fn filter(&self, spec: &FilterSpec) -> Option<Predicate> {
        // a falsy filter value matches false-or-missing: an unchecked
        // admin checkbox means "not true"
        let wanted = Value::from_json(&spec.value).truthy();
        let predicate = if wanted {
            Predicate::eq(&self.path, true)
        } else {
            Predicate::eq(&self.path, true).not()
        };

        Some(spec.apply_inversion(predicate))
    }
}

///
/// TESTS
///
