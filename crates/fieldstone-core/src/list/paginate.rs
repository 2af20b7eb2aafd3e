use crate::{
    document::Document,
    error::EngineError,
    list::List,
    predicate::Predicate,
    store::{Backend, Query},
};
use serde::Serialize;

const DEFAULT_PER_PAGE: u64 = 10;
const DEFAULT_MAX_PAGES: u64 = 10;

///
/// PaginateOptions
///

#[derive(Clone, Debug)]
pub struct PaginateOptions {
    pub page: u64,
    pub per_page: u64,
    /// Upper bound on the `pages` navigation window.
    pub max_pages: u64,
}

impl Default for PaginateOptions {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl PaginateOptions {
    #[must_use]
    pub fn page(page: u64) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page;
        self
    }
}

///
/// Page
///
/// One page window over a counted result set. `first`/`last` are
/// 1-based item indexes of the window ("showing 11 to 20 of 45");
/// `pages` is a contiguous navigation window around the current page.
///

#[derive(Clone, Debug, Serialize)]
pub struct Page {
    pub total: u64,
    pub results: Vec<Document>,
    pub current_page: u64,
    pub total_pages: u64,
    pub pages: Vec<u64>,
    pub previous: Option<u64>,
    pub next: Option<u64>,
    pub first: u64,
    pub last: u64,
}

impl List {
    /// Count, clamp, and fetch one page. A requested page out of range
    /// clamps to the nearest valid page instead of returning an empty
    /// window.
    pub fn paginate(
        &self,
        backend: &dyn Backend,
        predicate: &Predicate,
        options: &PaginateOptions,
    ) -> Result<Page, EngineError> {
        self.guard_registered()?;

        let per_page = options.per_page.max(1);
        let total = backend.count(self.key(), predicate)?;
        let total_pages = total.div_ceil(per_page).max(1);
        let current_page = options.page.clamp(1, total_pages);

        let skip = (current_page - 1) * per_page;
        let mut query = Query::new();
        query.and_where(predicate.clone());
        query.sort = self.default_sort();
        query.skip = usize::try_from(skip).unwrap_or(usize::MAX);
        query.limit = Some(usize::try_from(per_page).unwrap_or(usize::MAX));

        let results = backend.find(self.key(), &query)?;

        let first = if results.is_empty() { 0 } else { skip + 1 };
        let last = skip + u64::try_from(results.len()).unwrap_or(u64::MAX);

        Ok(Page {
            total,
            results,
            current_page,
            total_pages,
            pages: page_window(current_page, total_pages, options.max_pages.max(1)),
            previous: (current_page > 1).then(|| current_page - 1),
            next: (current_page < total_pages).then(|| current_page + 1),
            first,
            last,
        })
    }
}

/// Contiguous window of up to `max_pages` page numbers centered on the
/// current page, pinned to the valid range.
fn page_window(current: u64, total_pages: u64, max_pages: u64) -> Vec<u64> {
    let window = max_pages.min(total_pages);
    let half = window / 2;

    let start = if current <= half {
        1
    } else {
        (current - half).min(total_pages - window + 1)
    };

    (start..start + window).collect()
}

///
/// TESTS
///
