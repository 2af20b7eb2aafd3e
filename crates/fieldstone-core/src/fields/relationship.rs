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
use ulid::Ulid;

///
/// RelationshipKind
///
/// Stores one reference id — or an ordered list of ids when `many` —
/// pointing at documents of the target list named by `ref`. The target
/// key is validated when the owning list registers, not here: lists may
/// be defined in any order, but must all exist by registration time.
///

#[derive(Clone, Debug)]
pub struct RelationshipKind {
    path: String,
    target: String,
    many: bool,
}

impl RelationshipKind {
    pub(crate) fn build(ctx: &FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError> {
        let target = ctx
            .options
            .extra_str("ref")
            .ok_or_else(|| ctx.invalid("relationship requires a 'ref' key naming a list"))?;

        Ok(Arc::new(Self {
            path: ctx.path.to_string(),
            target: target.to_string(),
            many: ctx.options.extra_bool("many").unwrap_or(false),
        }))
    }

    /// Key of the referenced list.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub const fn is_many(&self) -> bool {
        self.many
    }

    fn parse_id(data: &Value) -> Option<Ulid> {
        match data {
            Value::Id(id) => Some(*id),
            Value::Text(s) => Ulid::from_string(s.trim()).ok(),
            _ => None,
        }
    }

    fn parse_ids(data: &Value) -> Vec<Ulid> {
        match data {
            Value::List(items) => items.iter().filter_map(Self::parse_id).collect(),
            other => Self::parse_id(other).into_iter().collect(),
        }
    }
}

impl FieldKind for RelationshipKind {
    fn type_id(&self) -> &'static str {
        "relationship"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn value_kind(&self) -> ValueKind {
        if self.many { ValueKind::List } else { ValueKind::Id }
    }

    fn consumed_keys(&self) -> &'static [&'static str] {
        &["ref", "many"]
    }

    fn validate_input(&self, data: &Value) -> bool {
        match data {
            Value::Null => true,
            Value::Text(s) if s.trim().is_empty() => true,
            Value::List(items) => {
                self.many && items.iter().all(|item| Self::parse_id(item).is_some())
            }
            other => Self::parse_id(other).is_some(),
        }
    }

    fn update_item(&self, item: &mut Document, data: &Value) {
        let value = if self.many {
            let ids = Self::parse_ids(data);
            if ids.is_empty() {
                Value::Null
            } else {
                Value::List(ids.into_iter().map(Value::Id).collect())
            }
        } else {
            Self::parse_id(data).map_or(Value::Null, Value::Id)
        };

        item.set(&self.path, value);
    }

    /// One id or an array of ids (OR semantics), optionally inverted.
    fn filter(&self, spec: &FilterSpec) -> Option<Predicate> {
        let predicate = if spec.value_is_empty() {
            Predicate::is_missing(&self.path)
        } else {
            let ids: Vec<Value> = spec
                .value_texts()
                .iter()
                .filter_map(|s| Ulid::from_string(s.trim()).ok())
                .map(Value::Id)
                .collect();

            if ids.is_empty() {
                // no well-formed id can match anything
                Predicate::False
            } else {
                Predicate::clause(&self.path, crate::predicate::Cmp::In, Value::List(ids))
            }
        };

        Some(spec.apply_inversion(predicate))
    }

    fn reference(&self) -> Option<(&str, bool)> {
        Some((&self.target, self.many))
    }
}

///
/// TESTS
///
