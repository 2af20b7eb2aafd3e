//! Module: fields
//! Responsibility: the per-type field kind contract and the built-in
//! type vocabulary (text, number, boolean, select, date, password,
//! relationship, geopoint).
//! Does not own: field options parsing, list assembly, or persistence.

mod boolean;
mod date;
mod geopoint;
mod number;
mod password;
mod relationship;
mod select;
mod text;

pub use boolean::BooleanKind;
pub use date::{DateArrayKind, DateKind};
pub use geopoint::GeoPointKind;
pub use number::{NumberArrayKind, NumberKind};
pub use password::PasswordKind;
pub use relationship::RelationshipKind;
pub use select::{SelectKind, SelectOption};
pub use text::{TextArrayKind, TextKind, TextValidation};

use crate::{
    document::Document, error::EngineError, field::FieldOptions, filter::FilterSpec,
    predicate::Predicate, schema::ValueKind, value::Value,
};
use std::{fmt::Debug, sync::Arc};

/// Default separator used when array-like types join members for display.
pub const DEFAULT_SEPARATOR: &str = ", ";

///
/// FieldContext
/// Construction-time view handed to a type's factory.
///

pub struct FieldContext<'a> {
    pub list_key: &'a str,
    pub path: &'a str,
    pub options: &'a FieldOptions,
}

impl FieldContext<'_> {
    /// Standard shape for a type-option error at construction time.
    pub(crate) fn invalid(&self, reason: impl Into<String>) -> EngineError {
        EngineError::InvalidFieldOptions {
            list: self.list_key.to_string(),
            path: self.path.to_string(),
            reason: reason.into(),
        }
    }
}

///
/// Contribution
/// A derived schema path a field kind contributes to its list.
///

pub type VirtualFn = Arc<dyn Fn(&Document) -> Value + Send + Sync>;

#[derive(Clone)]
pub enum Contribution {
    Stored { path: String, kind: ValueKind },
    Virtual { path: String, get: VirtualFn },
}

impl Debug for Contribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stored { path, kind } => write!(f, "Stored({path}: {kind:?})"),
            Self::Virtual { path, .. } => write!(f, "Virtual({path})"),
        }
    }
}

///
/// UnderscoreMethod
///
/// A named per-document operation a field kind contributes to the list's
/// capability table (`list.call(doc, path, op, args)`).
///

pub type UnderscoreFn = Arc<dyn Fn(&Document, &[Value]) -> Result<Value, EngineError> + Send + Sync>;

#[derive(Clone)]
pub struct UnderscoreMethod {
    pub name: &'static str,
    pub run: UnderscoreFn,
}

impl UnderscoreMethod {
    pub fn new<F>(name: &'static str, run: F) -> Self
    where
        F: Fn(&Document, &[Value]) -> Result<Value, EngineError> + Send + Sync + 'static,
    {
        Self {
            name,
            run: Arc::new(run),
        }
    }
}

impl Debug for UnderscoreMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UnderscoreMethod({})", self.name)
    }
}

///
/// FieldKind
///
/// The polymorphic per-type contract. Implementations are immutable
/// after construction; their only lifecycle transition is carried by the
/// owning list (unregistered → registered, one-way).
///

pub trait FieldKind: Debug + Send + Sync {
    /// Canonical type identifier (`"text"`, `"select"`, …).
    fn type_id(&self) -> &'static str;

    /// The schema path this kind reads and writes.
    fn path(&self) -> &str;

    /// Scalar shape of the primary stored path.
    fn value_kind(&self) -> ValueKind;

    /// Option keys this type interprets; everything else in the option
    /// bag is forwarded verbatim into schema metadata.
    fn consumed_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Declared default applied to missing paths on create.
    fn default_value(&self) -> Option<Value> {
        None
    }

    /// Syntactic validity of *offered* input, regardless of whether the
    /// field is required. Absent/null input is always valid here.
    fn validate_input(&self, data: &Value) -> bool;

    /// Presence check considering both the offered data and, when
    /// absent, the existing item value.
    fn validate_required_input(&self, item: &Document, data: Option<&Value>) -> bool {
        match data {
            Some(v) if !v.is_missing() => true,
            _ => !item.get(self.path()).is_missing(),
        }
    }

    /// Coerce validated input into the stored representation and mutate
    /// the document in memory. Unparseable numeric/date input stores a
    /// cleared value rather than raising, so a partial form save never
    /// produces a user-facing fatal error.
    fn update_item(&self, item: &mut Document, data: &Value);

    /// Display string for the current stored value(s). Pure.
    fn format(&self, item: &Document) -> String {
        item.get(self.path()).display_with(DEFAULT_SEPARATOR)
    }

    /// Translate a declarative filter into a predicate. `None` means
    /// the type is not filterable; the list treats that as a no-op
    /// condition, not an error.
    fn filter(&self, spec: &FilterSpec) -> Option<Predicate> {
        let _ = spec;
        None
    }

    /// Raw data read; types with storage quirks override to reshape.
    fn get_data(&self, item: &Document) -> Value {
        item.get(self.path()).clone()
    }

    /// Schema paths contributed to the owning list. The default is the
    /// single primary stored path.
    fn contributes(&self) -> Vec<Contribution> {
        vec![Contribution::Stored {
            path: self.path().to_string(),
            kind: self.value_kind(),
        }]
    }

    /// Capability-table entries for this field.
    fn underscore(&self) -> Vec<UnderscoreMethod> {
        Vec::new()
    }

    /// `(target list key, many)` when this kind is a reference. The
    /// list uses this to record outgoing relationships and validate
    /// their targets at registration.
    fn reference(&self) -> Option<(&str, bool)> {
        None
    }
}
