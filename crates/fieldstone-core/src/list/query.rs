use crate::{
    engine::Engine,
    error::EngineError,
    filter::FilterSpec,
    list::List,
    predicate::Predicate,
    store::{Query, SortDir, SortField},
};
use std::collections::BTreeMap;

///
/// Column
/// One projection entry parsed from a column spec string.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Column {
    pub path: String,
    pub width: Option<String>,
}

impl List {
    /// Parse a caller-supplied filter object (`{path: spec}`) into
    /// per-path filter specs. Shapes stay opaque here; unknown paths
    /// surface later, loudly, in [`List::add_filters_to_query`].
    #[must_use]
    pub fn process_filters(&self, raw: &serde_json::Value) -> BTreeMap<String, FilterSpec> {
        raw.as_object().map_or_else(BTreeMap::new, |obj| {
            obj.iter()
                .map(|(path, spec)| (path.clone(), FilterSpec::from_json(spec)))
                .collect()
        })
    }

    /// Translate declared filters and AND them onto the query.
    ///
    /// Paths resolve to this list's fields, or through one relationship
    /// hop (`author.name`) into the target list. An unknown path is an
    /// error — filters are never silently dropped. A field without
    /// filter support contributes a no-op condition.
    pub fn add_filters_to_query(
        &self,
        engine: &Engine,
        query: &mut Query,
        filters: &BTreeMap<String, FilterSpec>,
    ) -> Result<(), EngineError> {
        self.guard_registered()?;

        for (path, spec) in filters {
            let predicate = self.filter_predicate(engine, path, spec)?;
            query.and_where(predicate);
        }

        Ok(())
    }

    fn filter_predicate(
        &self,
        engine: &Engine,
        path: &str,
        spec: &FilterSpec,
    ) -> Result<Predicate, EngineError> {
        if let Some((head, rest)) = path.split_once('.') {
            let relationship =
                self.relationships()
                    .get(head)
                    .ok_or_else(|| EngineError::UnknownFilterPath {
                        list: self.key().to_string(),
                        path: path.to_string(),
                    })?;

            let target = engine.list(&relationship.target)?;
            let field = target
                .field(rest)
                .ok_or_else(|| EngineError::UnknownFilterPath {
                    list: target.key().to_string(),
                    path: rest.to_string(),
                })?;

            // keyed by the dotted path into the populated sub-document
            return Ok(field
                .filter(spec)
                .unwrap_or(Predicate::True)
                .prefix_paths(head));
        }

        let field = self
            .field(path)
            .ok_or_else(|| EngineError::UnknownFilterPath {
                list: self.key().to_string(),
                path: path.to_string(),
            })?;

        Ok(field.filter(spec).unwrap_or_else(|| {
            tracing::debug!(list = %self.key(), path, "field is not filterable; no-op");
            Predicate::True
        }))
    }

    /// OR a case-insensitive contains across the configured search
    /// fields (defaulting to the name mapping) onto the query.
    pub fn add_search_to_query(&self, query: &mut Query, term: &str) -> Result<(), EngineError> {
        self.guard_registered()?;

        let term = term.trim();
        if term.is_empty() {
            return Ok(());
        }

        let paths: Vec<String> = if self.options().search_fields.is_empty() {
            self.name_path().map(ToString::to_string).into_iter().collect()
        } else {
            self.options().search_fields.clone()
        };

        if paths.is_empty() {
            tracing::warn!(list = %self.key(), "no searchable fields; search ignored");
            return Ok(());
        }

        let mut predicate = Predicate::False;
        for path in paths {
            predicate = predicate.or(Predicate::contains_ci(path, term));
        }

        query.and_where(predicate.simplify());
        Ok(())
    }

    /// Parse a sort spec (`"-created_at name"`) into directives.
    /// Unknown paths are skipped with a warning — sorting is
    /// presentation, unlike filters.
    #[must_use]
    pub fn expand_sort(&self, spec: &str) -> Vec<SortField> {
        let mut out = Vec::new();

        for token in spec.split([' ', ',']).map(str::trim).filter(|t| !t.is_empty()) {
            let (dir, path) = token.strip_prefix('-').map_or((SortDir::Asc, token), |rest| {
                (SortDir::Desc, rest)
            });

            if self.schema().get(path).is_some() {
                out.push(SortField {
                    path: path.to_string(),
                    dir,
                });
            } else {
                tracing::warn!(list = %self.key(), path, "unknown sort path skipped");
            }
        }

        out
    }

    /// Parse a column spec (`"title|30%,state"`) into projections.
    #[must_use]
    pub fn expand_columns(&self, spec: &str) -> Vec<Column> {
        let mut out = Vec::new();

        for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (path, width) = token
                .split_once('|')
                .map_or((token, None), |(p, w)| (p, Some(w.to_string())));

            if self.schema().get(path).is_some() {
                out.push(Column {
                    path: path.to_string(),
                    width,
                });
            } else {
                tracing::warn!(list = %self.key(), path, "unknown column path skipped");
            }
        }

        out
    }

    /// The configured default sort, or empty.
    #[must_use]
    pub fn default_sort(&self) -> Vec<SortField> {
        self.options()
            .default_sort
            .clone()
            .map(|spec| self.expand_sort(&spec))
            .unwrap_or_default()
    }

    /// The configured default columns, falling back to every field in
    /// declaration order.
    #[must_use]
    pub fn default_columns(&self) -> Vec<Column> {
        self.options().default_columns.clone().map_or_else(
            || {
                self.fields()
                    .iter()
                    .map(|f| Column {
                        path: f.path.clone(),
                        width: None,
                    })
                    .collect()
            },
            |spec| self.expand_columns(&spec),
        )
    }
}
