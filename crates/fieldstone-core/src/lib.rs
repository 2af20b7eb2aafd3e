//! Core engine for Fieldstone: typed field kinds, value codecs, filter
//! translation, list/schema assembly, and the query/pagination helpers,
//! over a pluggable document backend.

pub mod cancel;
pub mod document;
pub mod engine;
pub mod error;
pub mod field;
pub mod fields;
pub mod filter;
pub mod list;
pub mod predicate;
pub mod registry;
pub mod schema;
pub mod store;
pub mod types;
pub mod value;

///
/// Prelude
///
/// Domain vocabulary only. Errors, backends, and wire helpers are
/// imported from their modules explicitly.
///

pub mod prelude {
    pub use crate::{
        document::Document,
        engine::Engine,
        field::{FieldDef, FieldOptions, RequiredSpec},
        filter::FilterSpec,
        list::{AddItem, List, ListOptions, PaginateOptions, TrackOptions, UpdateOutcome},
        predicate::Predicate,
        registry::{NativeType, TypeRef},
        types::Timestamp,
        value::Value,
    };
}
