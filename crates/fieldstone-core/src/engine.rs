use crate::{
    document::Document,
    error::EngineError,
    list::{List, ListOptions},
    predicate::Predicate,
    registry::{FieldTypeDescriptor, TypeRegistry},
    store::{Backend, Query},
    value::Value,
};
use std::{collections::BTreeMap, sync::Arc};
use ulid::Ulid;

///
/// RefDisplay
/// One expanded reference: target id plus its display name.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefDisplay {
    pub id: Ulid,
    pub name: String,
}

///
/// Engine
///
/// The constructible context: one field-type registry, one set of
/// registered lists, one persistence collaborator. No global state —
/// independent engines coexist in a process (and in tests).
///

#[derive(Debug)]
pub struct Engine {
    registry: Arc<TypeRegistry>,
    lists: BTreeMap<String, List>,
    backend: Arc<dyn Backend>,
}

impl Engine {
    /// Engine with the built-in type vocabulary.
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::with_registry(backend, TypeRegistry::builtin())
    }

    pub fn with_registry(backend: impl Backend + 'static, registry: TypeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            lists: BTreeMap::new(),
            backend: Arc::new(backend),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Register (or redefine) a field type. Affects lists defined
    /// afterwards; already-built fields keep their kind.
    pub fn register_type(&mut self, descriptor: FieldTypeDescriptor) {
        Arc::make_mut(&mut self.registry).register(descriptor);
    }

    /// Start a list definition bound to this engine's registry.
    #[must_use]
    pub fn new_list(&self, key: impl Into<String>, options: ListOptions) -> List {
        List::new(key, options, self.registry.clone())
    }

    /// Finalize a list: tracking/sort fields, reference validation,
    /// schema assembly, backend compilation. Exactly once per key.
    pub fn register(&mut self, mut list: List) -> Result<(), EngineError> {
        if list.is_registered() || self.lists.contains_key(list.key()) {
            return Err(EngineError::AlreadyRegistered(list.key().to_string()));
        }

        list.apply_builtin_fields()?;

        // every outgoing reference must name a known list (or the list
        // itself) by registration time
        for relationship in list.relationships().values() {
            let known = relationship.target == list.key()
                || self.lists.contains_key(&relationship.target);
            if !known {
                return Err(EngineError::UnresolvedReference {
                    list: list.key().to_string(),
                    path: relationship.path.clone(),
                    target: relationship.target.clone(),
                });
            }
        }

        list.finalize();
        self.backend.compile(list.key(), list.schema())?;
        self.lists.insert(list.key().to_string(), list);

        Ok(())
    }

    /// A registered list by key.
    pub fn list(&self, key: &str) -> Result<&List, EngineError> {
        self.lists
            .get(key)
            .ok_or_else(|| EngineError::ListNotRegistered(key.to_string()))
    }

    /// Registered lists in key order.
    pub fn lists(&self) -> impl Iterator<Item = &List> {
        self.lists.values()
    }

    /// Resolve a relationship path on one document into `{id, name}`
    /// pairs against the target list's display-name field.
    pub fn expand_relationship(
        &self,
        list_key: &str,
        item: &Document,
        path: &str,
    ) -> Result<Vec<RefDisplay>, EngineError> {
        let list = self.list(list_key)?;
        let relationship = list.relationships().get(path).ok_or_else(|| {
            EngineError::UnknownRelationship {
                list: list_key.to_string(),
                path: path.to_string(),
            }
        })?;

        let ids: Vec<Value> = match item.get(path) {
            Value::Id(id) => vec![Value::Id(*id)],
            Value::List(items) => items
                .iter()
                .filter(|v| v.as_id().is_some())
                .cloned()
                .collect(),
            _ => Vec::new(),
        };

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let target = self.list(&relationship.target)?;
        let mut query = Query::new();
        query.and_where(Predicate::clause(
            crate::document::ID_PATH,
            crate::predicate::Cmp::In,
            Value::List(ids),
        ));

        let documents = self.backend.find(target.key(), &query)?;
        Ok(documents
            .iter()
            .filter_map(|doc| {
                doc.id().map(|id| RefDisplay {
                    id,
                    name: target.display_name(doc),
                })
            })
            .collect())
    }
}

///
/// TESTS
///
