//! Fieldstone — a field-type schema engine for content lists.
//!
//! ## Crate layout
//! - `core`: field kinds, value codecs, filter translation, lists,
//!   pagination, and the in-memory backend.
//!
//! The `prelude` mirrors the surface a host application uses to define
//! lists and run queries; persistence and error types are reachable
//! through `core`.

pub use fieldstone_core as core;

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        cancel::CancelToken,
        document::Document,
        engine::{Engine, RefDisplay},
        error::{EngineError, ValidationFailure, ValidationFailures},
        field::{FieldDef, FieldOptions, RequiredSpec},
        filter::FilterSpec,
        list::{
            AddItem, Column, List, ListOptions, Page, PaginateOptions, TrackOptions, UiElement,
            UpdateData, UpdateOutcome,
        },
        predicate::{Cmp, Predicate},
        registry::{FieldTypeDescriptor, NativeType, TypeRef, TypeRegistry},
        store::{Backend, MemoryBackend, Query, SortDir, SortField},
        types::Timestamp,
        value::Value,
    };
}
