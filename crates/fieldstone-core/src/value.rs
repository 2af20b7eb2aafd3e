use crate::types::Timestamp;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::{borrow::Cow, cmp::Ordering, fmt};
use ulid::Ulid;

///
/// TextMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextMode {
    Cs, // case-sensitive
    Ci, // case-insensitive
}

///
/// Value
///
/// The engine's stored-scalar vocabulary.
///
/// Null  → the path holds no value (absent and null are the same thing).
/// List  → ordered values; used by array-typed and many-relationship fields.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(Timestamp),
    Id(Ulid),
    List(Vec<Self>),
}

impl Value {
    ///
    /// CONSTRUCTION
    ///

    /// Build a `Value::List` from owned items.
    pub fn from_list<T>(items: Vec<T>) -> Self
    where
        T: Into<Self>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Convert an opaque wire value (a caller-supplied JSON payload)
    /// into the engine vocabulary. Strings stay strings; nothing is
    /// guessed beyond the JSON scalar kinds.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n.as_i64().map_or_else(
                || n.as_f64().map_or(Self::Null, Self::Float),
                Self::Int,
            ),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            serde_json::Value::Array(items) => {
                Self::List(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(_) => Self::Null,
        }
    }

    ///
    /// TYPES
    ///

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Presence/absence notion used by default filter modes: null, the
    /// empty string, and the empty list all read as missing.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            _ => false,
        }
    }

    #[must_use]
    pub const fn as_text(&self) -> Option<&str> {
        if let Self::Text(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_list(&self) -> Option<&[Self]> {
        if let Self::List(items) = self {
            Some(items.as_slice())
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        if let Self::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_timestamp(&self) -> Option<Timestamp> {
        if let Self::Timestamp(ts) = self {
            Some(*ts)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_id(&self) -> Option<Ulid> {
        if let Self::Id(id) = self {
            Some(*id)
        } else {
            None
        }
    }

    /// Truthiness used by boolean coercion and dependency checks.
    /// The literal strings "false" and "0" read as false.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => {
                let s = s.trim();
                !(s.is_empty() || s.eq_ignore_ascii_case("false") || s == "0")
            }
            Self::List(items) => !items.is_empty(),
            Self::Timestamp(_) | Self::Id(_) => true,
        }
    }

    ///
    /// COMPARISON
    ///

    #[expect(clippy::cast_precision_loss)]
    fn numeric(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Cross-variant numeric comparison; `None` for non-numerics.
    #[must_use]
    pub fn cmp_numeric(&self, other: &Self) -> Option<Ordering> {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }

    /// Equality with Int/Float cross-variant coercion. Everything else
    /// is strict variant equality.
    #[must_use]
    pub fn eq_loose(&self, other: &Self) -> bool {
        if let Some(ord) = self.cmp_numeric(other) {
            return ord == Ordering::Equal;
        }

        self == other
    }

    /// Ordering comparison for same-family values; `None` across
    /// unrelated variants.
    #[must_use]
    pub fn cmp_order(&self, other: &Self) -> Option<Ordering> {
        if let Some(ord) = self.cmp_numeric(other) {
            return Some(ord);
        }

        match (self, other) {
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Id(a), Self::Id(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Stable variant rank for cross-variant sort fallback.
    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Timestamp(_) => 3,
            Self::Text(_) => 4,
            Self::Id(_) => 5,
            Self::List(_) => 6,
        }
    }

    /// Total comparator used by backend sorting. Missing values sort
    /// first ascending; unrelated variants order by rank.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.cmp_order(other)
            .unwrap_or_else(|| self.rank().cmp(&other.rank()))
    }

    ///
    /// TEXT COMPARISON
    ///

    fn fold_ci(s: &str) -> Cow<'_, str> {
        if s.is_ascii() {
            Cow::Owned(s.to_ascii_lowercase())
        } else {
            Cow::Owned(s.to_lowercase())
        }
    }

    fn text_with_mode(s: &str, mode: TextMode) -> Cow<'_, str> {
        match mode {
            TextMode::Cs => Cow::Borrowed(s),
            TextMode::Ci => Self::fold_ci(s),
        }
    }

    fn text_op(&self, other: &Self, mode: TextMode, f: impl Fn(&str, &str) -> bool) -> Option<bool> {
        let (a, b) = (self.as_text()?, other.as_text()?);
        let a = Self::text_with_mode(a, mode);
        let b = Self::text_with_mode(b, mode);
        Some(f(&a, &b))
    }

    #[must_use]
    pub fn text_eq(&self, other: &Self, mode: TextMode) -> Option<bool> {
        self.text_op(other, mode, |a, b| a == b)
    }

    #[must_use]
    pub fn text_contains(&self, needle: &Self, mode: TextMode) -> Option<bool> {
        self.text_op(needle, mode, |a, b| a.contains(b))
    }

    #[must_use]
    pub fn text_starts_with(&self, needle: &Self, mode: TextMode) -> Option<bool> {
        self.text_op(needle, mode, |a, b| a.starts_with(b))
    }

    #[must_use]
    pub fn text_ends_with(&self, needle: &Self, mode: TextMode) -> Option<bool> {
        self.text_op(needle, mode, |a, b| a.ends_with(b))
    }

    ///
    /// MEMBERSHIP
    ///

    /// True when `self` (or, for list values, any member) matches a
    /// member of `haystack` under loose equality.
    #[must_use]
    pub fn in_list(&self, haystack: &[Self]) -> bool {
        match self {
            Self::List(items) => items
                .iter()
                .any(|item| haystack.iter().any(|h| h.eq_loose(item))),
            scalar => haystack.iter().any(|h| h.eq_loose(scalar)),
        }
    }

    /// True when `self` is a text value containing `needle` as a
    /// substring, or a list with a member containing/equalling it.
    #[must_use]
    pub fn contains(&self, needle: &Self, mode: TextMode) -> bool {
        match self {
            Self::List(items) => items.iter().any(|item| {
                item.text_contains(needle, mode)
                    .unwrap_or_else(|| item.eq_loose(needle))
            }),
            Self::Text(_) => self.text_contains(needle, mode).unwrap_or(false),
            _ => false,
        }
    }

    ///
    /// DISPLAY
    ///

    /// Display form used by export rows and default formatting.
    /// Null renders empty; lists join with a separator.
    #[must_use]
    pub fn display_with(&self, separator: &str) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Timestamp(ts) => ts.to_string(),
            Self::Id(id) => id.to_string(),
            Self::List(items) => items
                .iter()
                .map(|item| item.display_with(separator))
                .collect::<Vec<_>>()
                .join(separator),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_with(", "))
    }
}

// Wire form mirrors JSON scalars: ids and timestamps cross as strings.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Timestamp(ts) => serializer.serialize_str(&ts.to_string()),
            Self::Id(id) => serializer.serialize_str(&id.to_string()),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

#[macro_export]
macro_rules! impl_from_for {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for! {
    bool      => Bool,
    i8        => Int,
    i16       => Int,
    i32       => Int,
    i64       => Int,
    f32       => Float,
    f64       => Float,
    &str      => Text,
    String    => Text,
    Timestamp => Timestamp,
    Ulid      => Id,
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::from_list(items)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_covers_null_empty_text_empty_list() {
        assert!(Value::Null.is_missing());
        assert!(Value::Text(String::new()).is_missing());
        assert!(Value::List(vec![]).is_missing());
        assert!(!Value::Text("x".into()).is_missing());
        assert!(!Value::Int(0).is_missing());
    }

    #[test]
    fn loose_equality_crosses_int_and_float() {
        assert!(Value::Int(3).eq_loose(&Value::Float(3.0)));
        assert!(!Value::Int(3).eq_loose(&Value::Float(3.5)));
        assert!(!Value::Int(3).eq_loose(&Value::Text("3".into())));
    }

    #[test]
    fn truthiness_of_literal_strings() {
        assert!(!Value::Text("false".into()).truthy());
        assert!(!Value::Text("FALSE".into()).truthy());
        assert!(!Value::Text("0".into()).truthy());
        assert!(!Value::Text("  ".into()).truthy());
        assert!(Value::Text("yes".into()).truthy());
    }

    #[test]
    fn ci_text_ops_fold_case() {
        let hay = Value::Text("Hello World".into());
        let needle = Value::Text("hello".into());
        assert_eq!(hay.text_contains(&needle, TextMode::Ci), Some(true));
        assert_eq!(hay.text_contains(&needle, TextMode::Cs), Some(false));
        assert_eq!(hay.text_starts_with(&needle, TextMode::Ci), Some(true));
    }

    #[test]
    fn membership_treats_list_values_as_any_of() {
        let stored = Value::from_list(vec!["a", "b"]);
        let wanted = vec![Value::Text("b".into()), Value::Text("z".into())];
        assert!(stored.in_list(&wanted));
        assert!(Value::Text("z".into()).in_list(&wanted));
        assert!(!Value::Text("q".into()).in_list(&wanted));
    }

    #[test]
    fn sort_cmp_is_total_across_variants() {
        assert_eq!(
            Value::Null.sort_cmp(&Value::Int(1)),
            std::cmp::Ordering::Less
        );
        assert_eq!(
            Value::Int(2).sort_cmp(&Value::Float(2.5)),
            std::cmp::Ordering::Less
        );
        assert_eq!(
            Value::Text("a".into()).sort_cmp(&Value::Text("b".into())),
            std::cmp::Ordering::Less
        );
    }

    #[test]
    fn from_json_maps_scalars() {
        let json = serde_json::json!(["x", 2, 2.5, true, null]);
        let value = Value::from_json(&json);
        assert_eq!(
            value,
            Value::List(vec![
                Value::Text("x".into()),
                Value::Int(2),
                Value::Float(2.5),
                Value::Bool(true),
                Value::Null,
            ])
        );
    }
}
