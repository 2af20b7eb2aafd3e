use crate::{
    document::Document,
    error::EngineError,
    fields::{Contribution, FieldContext, FieldKind, UnderscoreMethod},
    filter::FilterSpec,
    predicate::Predicate,
    schema::ValueKind,
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

///
/// SelectOption
/// One declared option: canonical value plus a display label.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

///
/// SelectKind
///
/// Options normalize from three accepted shapes — a comma-string, an
/// array of scalars, or an array of `{value, label}` objects — into one
/// canonical ordered list. Duplicate values keep the first occurrence.
///

#[derive(Clone, Debug)]
pub struct SelectKind {
    path: String,
    options: Vec<SelectOption>,
}

impl SelectKind {
    pub(crate) fn build(ctx: &FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError> {
        let declared = ctx
            .options
            .extra_value("options")
            .ok_or_else(|| ctx.invalid("select requires an 'options' key"))?;

        let options = normalize_options(declared)
            .map_err(|reason| ctx.invalid(reason))?;

        if options.is_empty() {
            return Err(ctx.invalid("select requires at least one option"));
        }

        Ok(Arc::new(Self {
            path: ctx.path.to_string(),
            options,
        }))
    }

    /// The canonical ordered option list.
    #[must_use]
    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    /// Look up one declared option by value.
    #[must_use]
    pub fn option(&self, value: &str) -> Option<&SelectOption> {
        self.options.iter().find(|o| o.value == value)
    }

    fn declared_values(&self) -> Vec<Value> {
        self.options
            .iter()
            .map(|o| Value::Text(o.value.clone()))
            .collect()
    }

    fn label_for(options: &[SelectOption], stored: &Value) -> Value {
        stored
            .as_text()
            .and_then(|v| options.iter().find(|o| o.value == v))
            .map_or(Value::Null, |o| Value::Text(o.label.clone()))
    }

    fn label_path(&self) -> String {
        format!("{}_label", self.path)
    }
}

fn normalize_options(declared: &serde_json::Value) -> Result<Vec<SelectOption>, String> {
    let mut out: Vec<SelectOption> = Vec::new();

    let mut push = |value: String, label: Option<String>| {
        if !value.is_empty() && !out.iter().any(|o| o.value == value) {
            let label = label.unwrap_or_else(|| value.clone());
            out.push(SelectOption { value, label });
        }
    };

    match declared {
        serde_json::Value::String(csv) => {
            for part in csv.split(',') {
                push(part.trim().to_string(), None);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                match item {
                    serde_json::Value::String(s) => push(s.trim().to_string(), None),
                    serde_json::Value::Number(n) => push(n.to_string(), None),
                    serde_json::Value::Object(obj) => {
                        let value = obj
                            .get("value")
                            .and_then(|v| match v {
                                serde_json::Value::String(s) => Some(s.clone()),
                                serde_json::Value::Number(n) => Some(n.to_string()),
                                _ => None,
                            })
                            .ok_or_else(|| {
                                "select option object requires a 'value' key".to_string()
                            })?;
                        let label = obj
                            .get("label")
                            .and_then(serde_json::Value::as_str)
                            .map(ToString::to_string);
                        push(value, label);
                    }
                    _ => return Err(format!("unsupported select option: {item}")),
                }
            }
        }
        other => return Err(format!("unsupported select options shape: {other}")),
    }

    Ok(out)
}

impl FieldKind for SelectKind {
    fn type_id(&self) -> &'static str {
        "select"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn consumed_keys(&self) -> &'static [&'static str] {
        &["options"]
    }

    fn validate_input(&self, data: &Value) -> bool {
        match data {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty() || self.option(s.trim()).is_some(),
            _ => false,
        }
    }

    fn update_item(&self, item: &mut Document, data: &Value) {
        let value = data
            .as_text()
            .map(str::trim)
            .filter(|s| self.option(s).is_some())
            .map_or(Value::Null, |s| Value::Text(s.to_string()));
        item.set(&self.path, value);
    }

    fn format(&self, item: &Document) -> String {
        // display the label, falling back to the raw stored value
        let stored = item.get(&self.path);
        match Self::label_for(&self.options, stored) {
            Value::Text(label) => label,
            _ => stored.display_with(", "),
        }
    }

    /// One value or an array (OR semantics), with optional inversion.
    /// An empty/absent value matches documents whose stored value is
    /// absent or not among the declared values; an explicit empty array
    /// matches nothing (inverted: everything holding a declared value).
    fn filter(&self, spec: &FilterSpec) -> Option<Predicate> {
        let declared = self.declared_values();

        let predicate = if spec.value_is_empty() {
            let base = Predicate::is_missing(&self.path)
                .or(Predicate::not_in_iter(&self.path, declared.clone()));
            if spec.inverted {
                Predicate::in_iter(&self.path, declared)
            } else {
                base
            }
        } else if matches!(&spec.value, serde_json::Value::Array(items) if items.is_empty()) {
            if spec.inverted {
                Predicate::in_iter(&self.path, declared)
            } else {
                Predicate::False
            }
        } else {
            let wanted: Vec<Value> = spec
                .value_texts()
                .into_iter()
                .map(Value::Text)
                .collect();
            let base = Predicate::in_iter(&self.path, wanted);
            if spec.inverted { base.not() } else { base }
        };

        Some(predicate)
    }

    fn contributes(&self) -> Vec<Contribution> {
        let options = self.options.clone();
        let path = self.path.clone();

        vec![
            Contribution::Stored {
                path: self.path.clone(),
                kind: ValueKind::Text,
            },
            Contribution::Virtual {
                path: self.label_path(),
                get: Arc::new(move |doc: &Document| {
                    Self::label_for(&options, doc.get(&path))
                }),
            },
        ]
    }

    fn underscore(&self) -> Vec<UnderscoreMethod> {
        let options = self.options.clone();
        let path = self.path.clone();

        let label_options = options.clone();
        let label_path = path.clone();
        let option_options = options.clone();
        let option_path = path.clone();

        vec![
            // selected option's display label
            UnderscoreMethod::new("label", move |doc, _args| {
                Ok(SelectKind::label_for(&label_options, doc.get(&label_path)))
            }),
            // selected option as a (value, label) pair
            UnderscoreMethod::new("option", move |doc, _args| {
                let selected = doc
                    .get(&option_path)
                    .as_text()
                    .and_then(|v| option_options.iter().find(|o| o.value == v));
                Ok(selected.map_or(Value::Null, |o| {
                    Value::List(vec![
                        Value::Text(o.value.clone()),
                        Value::Text(o.label.clone()),
                    ])
                }))
            }),
            // canonical option list as (value, label) pairs
            UnderscoreMethod::new("options", move |_doc, _args| {
                Ok(Value::List(
                    options
                        .iter()
                        .map(|o| {
                            Value::List(vec![
                                Value::Text(o.value.clone()),
                                Value::Text(o.label.clone()),
                            ])
                        })
                        .collect(),
                ))
            }),
        ]
    }
}

///
/// TESTS
///
