use crate::{
    cancel::CancelToken,
    error::EngineError,
    list::{Column, List},
    predicate::Predicate,
    store::{Backend, Query},
};

impl List {
    /// Format matching documents into display rows for the given
    /// columns (CSV-style export). The cancellation token is checked
    /// between documents; a cancelled export surfaces `Cancelled`
    /// rather than handing back a partial result.
    pub fn export_rows(
        &self,
        backend: &dyn Backend,
        columns: &[Column],
        predicate: &Predicate,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<Vec<String>>, EngineError> {
        self.guard_registered()?;

        let mut query = Query::new();
        query.and_where(predicate.clone());
        query.sort = self.default_sort();

        let documents = backend.find(self.key(), &query)?;

        let mut rows = Vec::with_capacity(documents.len());
        for doc in &documents {
            if let Some(token) = cancel {
                token.check()?;
            }

            rows.push(
                columns
                    .iter()
                    .map(|column| self.format(doc, &column.path))
                    .collect(),
            );
        }

        Ok(rows)
    }

    /// Header labels for the given columns.
    #[must_use]
    pub fn export_headers(&self, columns: &[Column]) -> Vec<String> {
        columns
            .iter()
            .map(|column| {
                self.field(&column.path)
                    .map_or_else(|| column.path.clone(), |f| f.label.clone())
            })
            .collect()
    }
}

///
/// TESTS
///
