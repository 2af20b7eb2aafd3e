use crate::{
    document::Document,
    error::{EngineError, ValidationFailure, ValidationFailures},
    list::List,
    predicate::Predicate,
    store::Backend,
    types::Timestamp,
    value::Value,
};
use std::collections::BTreeMap;
use ulid::Ulid;

/// Offered form input, one raw value per field path.
pub type UpdateData = BTreeMap<String, Value>;

///
/// UpdateOutcome
///
/// Per-document validation failures are data, not errors: a rejected
/// update carries every failing field so one form submission reports
/// them all at once.
///

#[derive(Debug)]
pub enum UpdateOutcome {
    Applied,
    Rejected(ValidationFailures),
}

impl UpdateOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Promote a rejection into an error carrying the first failure.
    pub fn into_result(self) -> Result<(), EngineError> {
        match self {
            Self::Applied => Ok(()),
            Self::Rejected(failures) => {
                let first = failures
                    .0
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| ValidationFailure::new("", "rejected"));
                Err(EngineError::ValidationFailed {
                    field: first.field,
                    reason: first.reason,
                })
            }
        }
    }
}

impl List {
    /// Validate-then-apply, all or nothing: every field is validated
    /// (syntactic, required, unique) before any field mutates the
    /// document, so a rejected update leaves it untouched. On success
    /// the document is stamped and persisted in one `save`.
    pub fn update_item(
        &self,
        backend: &dyn Backend,
        item: &mut Document,
        data: &UpdateData,
        actor: Option<Ulid>,
    ) -> Result<UpdateOutcome, EngineError> {
        self.guard_registered()?;

        let failures = self.validate_all(backend, item, data)?;
        if !failures.is_empty() {
            return Ok(UpdateOutcome::Rejected(failures));
        }

        let creating = item.id().is_none();
        self.apply_all(item, data, creating);
        self.stamp_tracking(item, actor, creating);

        backend.save(self.key(), item)?;
        Ok(UpdateOutcome::Applied)
    }

    fn validate_all(
        &self,
        backend: &dyn Backend,
        item: &Document,
        data: &UpdateData,
    ) -> Result<ValidationFailures, EngineError> {
        // requirement predicates may depend on paths arriving in this
        // same submission; evaluate them against a preview
        let mut preview = item.clone();
        for (path, value) in data {
            preview.set(path.clone(), value.clone());
        }

        let mut failures = ValidationFailures::default();

        for field in self.fields() {
            let offered = data.get(&field.path);

            if let Some(value) = offered
                && !field.validate_input(value)
            {
                failures.push(ValidationFailure::new(&field.path, "is invalid"));
                continue;
            }

            if field.is_required(&preview) && !field.validate_required_input(item, offered) {
                failures.push(ValidationFailure::new(&field.path, "is required"));
                continue;
            }

            if field.options.unique
                && let Some(value) = offered
                && !value.is_missing()
            {
                let mut collision = Predicate::clause(
                    &field.path,
                    crate::predicate::Cmp::Eq,
                    value.clone(),
                );
                if let Some(id) = item.id() {
                    collision = collision.and(Predicate::ne(crate::document::ID_PATH, id));
                }

                if backend.count(self.key(), &collision)? > 0 {
                    failures.push(ValidationFailure::new(&field.path, "must be unique"));
                }
            }
        }

        Ok(failures)
    }

    fn apply_all(&self, item: &mut Document, data: &UpdateData, creating: bool) {
        for field in self.fields() {
            if field.options.noedit && !creating {
                continue;
            }

            if let Some(value) = data.get(&field.path) {
                field.update_item(item, value);
                continue;
            }

            // watched fields re-derive from their default when any
            // watched path arrives in this submission
            let watch_hit = field
                .watched_paths()
                .iter()
                .any(|watched| data.contains_key(*watched));

            if watch_hit {
                if let Some(default) = field.default_value() {
                    field.update_item(item, &default);
                }
                continue;
            }

            if creating
                && item.get(&field.path).is_missing()
                && let Some(default) = field.default_value()
            {
                field.update_item(item, &default);
            }
        }
    }

    fn stamp_tracking(&self, item: &mut Document, actor: Option<Ulid>, creating: bool) {
        let track = &self.options().track;
        let now = Timestamp::now();

        if track.created_at && creating {
            item.set("created_at", Value::Timestamp(now));
        }
        if track.updated_at {
            item.set("updated_at", Value::Timestamp(now));
        }
        if let Some(actor) = actor {
            if track.created_by && creating && track.user_list.is_some() {
                item.set("created_by", Value::Id(actor));
            }
            if track.updated_by && track.user_list.is_some() {
                item.set("updated_by", Value::Id(actor));
            }
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        field::{FieldDef, FieldOptions},
        list::{AddItem, ListOptions, TrackOptions},
        registry::TypeRegistry,
        store::MemoryBackend,
    };
    use std::sync::Arc;

    fn registered_list(backend: &MemoryBackend) -> List {
        let mut list = List::new(
            "Post",
            ListOptions::default(),
            Arc::new(TypeRegistry::builtin()),
        );
        list.add([
            AddItem::from(
                FieldDef::new("title", "text").with_options(FieldOptions::new().required()),
            ),
            AddItem::from(
                FieldDef::new("slug", "text").with_options(FieldOptions::new().unique()),
            ),
            AddItem::from(FieldDef::new("count", "number")),
        ])
        .unwrap();
        list.finalize();
        backend.compile("Post", list.schema()).unwrap();
        list
    }

    fn data(pairs: &[(&str, Value)]) -> UpdateData {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn applies_and_persists() {
        let backend = MemoryBackend::new();
        let list = registered_list(&backend);

        let mut doc = Document::new();
        let outcome = list
            .update_item(
                &backend,
                &mut doc,
                &data(&[
                    ("title", Value::Text("Hello".into())),
                    ("count", Value::Text("42".into())),
                ]),
                None,
            )
            .unwrap();

        assert!(outcome.is_applied());
        assert!(doc.id().is_some());
        assert_eq!(doc.get("count"), &Value::Int(42));
        assert_eq!(backend.count("Post", &Predicate::True).unwrap(), 1);
    }

    #[test]
    fn rejected_update_leaves_document_unchanged() {
        let backend = MemoryBackend::new();
        let list = registered_list(&backend);

        let mut doc = Document::new();
        doc.set("count", 7);
        let before = doc.clone();

        let outcome = list
            .update_item(
                &backend,
                &mut doc,
                // missing required title AND a count update that must
                // not be applied
                &data(&[("count", Value::Text("99".into()))]),
                None,
            )
            .unwrap();

        match outcome {
            UpdateOutcome::Rejected(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].field, "title");
            }
            UpdateOutcome::Applied => panic!("expected rejection"),
        }

        assert_eq!(doc, before);
        assert_eq!(backend.count("Post", &Predicate::True).unwrap(), 0);
    }

    #[test]
    fn aggregates_every_failure() {
        let backend = MemoryBackend::new();
        let list = registered_list(&backend);

        let mut doc = Document::new();
        let outcome = list
            .update_item(
                &backend,
                &mut doc,
                &data(&[("count", Value::Text("not a number".into()))]),
                None,
            )
            .unwrap();

        match outcome {
            UpdateOutcome::Rejected(failures) => {
                let fields: Vec<&str> =
                    failures.iter().map(|f| f.field.as_str()).collect();
                // declaration order: title's missing requirement first,
                // then count's syntactic failure
                assert_eq!(fields, vec!["title", "count"]);
            }
            UpdateOutcome::Applied => panic!("expected rejection"),
        }
    }

    #[test]
    fn unique_collision_rejects() {
        let backend = MemoryBackend::new();
        let list = registered_list(&backend);

        let mut first = Document::new();
        list.update_item(
            &backend,
            &mut first,
            &data(&[
                ("title", Value::Text("One".into())),
                ("slug", Value::Text("post".into())),
            ]),
            None,
        )
        .unwrap();

        let mut second = Document::new();
        let outcome = list
            .update_item(
                &backend,
                &mut second,
                &data(&[
                    ("title", Value::Text("Two".into())),
                    ("slug", Value::Text("post".into())),
                ]),
                None,
            )
            .unwrap();

        assert!(!outcome.is_applied());

        // updating the same document keeps its own slug without a
        // self-collision
        let outcome = list
            .update_item(
                &backend,
                &mut first,
                &data(&[("slug", Value::Text("post".into()))]),
                None,
            )
            .unwrap();
        assert!(outcome.is_applied());
    }

    #[test]
    fn tracking_stamps_on_create_and_update() {
        let backend = MemoryBackend::new();
        let mut list = List::new(
            "Post",
            ListOptions {
                track: TrackOptions::all("User"),
                ..ListOptions::default()
            },
            Arc::new(TypeRegistry::builtin()),
        );
        list.add([AddItem::from(FieldDef::new("title", "text"))]).unwrap();
        list.apply_builtin_fields().unwrap();
        list.finalize();
        backend.compile("Post", list.schema()).unwrap();

        let actor = Ulid::from_parts(5, 5);
        let mut doc = Document::new();
        list.update_item(
            &backend,
            &mut doc,
            &data(&[("title", Value::Text("x".into()))]),
            Some(actor),
        )
        .unwrap();

        assert!(doc.get("created_at").as_timestamp().is_some());
        assert!(doc.get("updated_at").as_timestamp().is_some());
        assert_eq!(doc.get("created_by"), &Value::Id(actor));
        assert_eq!(doc.get("updated_by"), &Value::Id(actor));
    }

    #[test]
    fn defaults_apply_on_create_only() {
        let backend = MemoryBackend::new();
        let mut list = List::new(
            "Post",
            ListOptions::default(),
            Arc::new(TypeRegistry::builtin()),
        );
        list.add([
            AddItem::from(FieldDef::new("title", "text")),
            AddItem::from(
                FieldDef::new("state", "select").with_options(
                    FieldOptions::new()
                        .with("options", serde_json::json!("draft, published"))
                        .default_json(serde_json::json!("draft")),
                ),
            ),
        ])
        .unwrap();
        list.finalize();
        backend.compile("Post", list.schema()).unwrap();

        let mut doc = Document::new();
        list.update_item(
            &backend,
            &mut doc,
            &data(&[("title", Value::Text("x".into()))]),
            None,
        )
        .unwrap();
        assert_eq!(doc.get("state"), &Value::Text("draft".into()));

        // clearing on a later update stays cleared
        list.update_item(
            &backend,
            &mut doc,
            &data(&[("state", Value::Null)]),
            None,
        )
        .unwrap();
        assert!(doc.get("state").is_missing());
    }
}
