use crate::{
    document::Document,
    error::EngineError,
    fields::{Contribution, DEFAULT_SEPARATOR, FieldContext, FieldKind},
    filter::FilterSpec,
    predicate::Predicate,
    schema::ValueKind,
    types::{DEFAULT_PATTERNS, DateFormats, Timestamp},
    value::Value,
};
use std::sync::Arc;

const MODES: &[&str] = &["on", "after", "before", "between"];
const DEFAULT_MODE: &str = "on";
const DATE_DISPLAY: &str = "[year]-[month]-[day]";

///
/// Granularity
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Granularity {
    DateOnly,
    DateTime,
}

///
/// DateKind
///
/// Input parsing tries the configured candidate formats in order; the
/// first successful parse wins. Date-only fields snap to midnight UTC.
///
/// `legacy_utc_offset` (minutes) is a backward-compatibility shim for
/// historical data that was stored as if local time were UTC: reads
/// re-interpret the stored instant by that offset, and the offset is
/// recorded alongside under `{path}_tz`. Strictly opt-in.
///

#[derive(Debug)]
pub struct DateKind {
    path: String,
    granularity: Granularity,
    formats: DateFormats,
    display: Option<String>,
    legacy_offset: Option<i64>,
}

impl DateKind {
    pub(crate) fn build_date(ctx: &FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError> {
        Self::build_granular(ctx, Granularity::DateOnly)
    }

    pub(crate) fn build_datetime(
        ctx: &FieldContext<'_>,
    ) -> Result<Arc<dyn FieldKind>, EngineError> {
        Self::build_granular(ctx, Granularity::DateTime)
    }

    fn build_granular(
        ctx: &FieldContext<'_>,
        granularity: Granularity,
    ) -> Result<Arc<dyn FieldKind>, EngineError> {
        Ok(Arc::new(Self {
            path: ctx.path.to_string(),
            granularity,
            formats: configured_formats(ctx)?,
            display: ctx.options.extra_str("format").map(ToString::to_string),
            legacy_offset: ctx.options.extra_i64("legacy_utc_offset"),
        }))
    }

    fn tz_path(&self) -> String {
        format!("{}_tz", self.path)
    }

    fn snap(&self, ts: Timestamp) -> Timestamp {
        match self.granularity {
            Granularity::DateOnly => ts.day_start(),
            Granularity::DateTime => ts,
        }
    }

    fn parse_offered(&self, data: &Value) -> Option<Timestamp> {
        parse_with(&self.formats, data)
    }
}

fn configured_formats(ctx: &FieldContext<'_>) -> Result<DateFormats, EngineError> {
    match ctx.options.extra_value("formats") {
        None => DateFormats::new(DEFAULT_PATTERNS).map_err(|reason| ctx.invalid(reason)),
        Some(serde_json::Value::Array(items)) => {
            let patterns: Vec<String> = items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(ToString::to_string)
                .collect();
            if patterns.len() != items.len() {
                return Err(ctx.invalid("'formats' must be an array of pattern strings"));
            }
            DateFormats::new(&patterns).map_err(|reason| ctx.invalid(reason))
        }
        Some(_) => Err(ctx.invalid("'formats' must be an array of pattern strings")),
    }
}

fn parse_with(formats: &DateFormats, data: &Value) -> Option<Timestamp> {
    match data {
        Value::Timestamp(ts) => Some(*ts),
        Value::Int(secs) => Some(Timestamp::new(*secs)),
        Value::Text(s) => formats.parse(s),
        _ => None,
    }
}

fn parse_json_bound(formats: &DateFormats, json: &serde_json::Value) -> Option<Timestamp> {
    match json {
        serde_json::Value::String(s) => formats.parse(s),
        serde_json::Value::Number(n) => n.as_i64().map(Timestamp::new),
        _ => None,
    }
}

/// Shared translation for date-valued filters.
fn date_filter(path: &str, formats: &DateFormats, spec: &FilterSpec) -> Predicate {
    let mode = spec.mode_among(MODES, DEFAULT_MODE);

    let predicate = match mode {
        "between" => {
            let (low, high) = match spec.value.as_array() {
                Some(pair) if pair.len() == 2 => (
                    parse_json_bound(formats, &pair[0]),
                    parse_json_bound(formats, &pair[1]),
                ),
                _ => (
                    parse_json_bound(formats, &spec.after),
                    parse_json_bound(formats, &spec.before),
                ),
            };

            match (low, high) {
                // inclusive on both bounds
                (Some(low), Some(high)) => Predicate::between(path, low, high),
                (Some(low), None) => Predicate::gte(path, low),
                (None, Some(high)) => Predicate::lte(path, high),
                (None, None) => Predicate::True,
            }
        }
        "after" | "before" => match parse_json_bound(formats, &spec.value) {
            Some(ts) if mode == "after" => Predicate::gt(path, ts),
            Some(ts) => Predicate::lt(path, ts),
            None => Predicate::True,
        },
        // "on": the whole calendar day, both edges included
        _ => match parse_json_bound(formats, &spec.value) {
            Some(ts) => Predicate::between(path, ts.day_start(), ts.day_end()),
            None => Predicate::is_missing(path),
        },
    };

    spec.apply_inversion(predicate)
}

impl FieldKind for DateKind {
    fn type_id(&self) -> &'static str {
        match self.granularity {
            Granularity::DateOnly => "date",
            Granularity::DateTime => "datetime",
        }
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Timestamp
    }

    fn consumed_keys(&self) -> &'static [&'static str] {
        &["formats", "format", "legacy_utc_offset"]
    }

    fn validate_input(&self, data: &Value) -> bool {
        match data {
            Value::Null => true,
            Value::Text(s) if s.trim().is_empty() => true,
            other => self.parse_offered(other).is_some(),
        }
    }

    fn update_item(&self, item: &mut Document, data: &Value) {
        match self.parse_offered(data) {
            Some(ts) => {
                item.set(&self.path, Value::Timestamp(self.snap(ts)));
                if let Some(offset) = self.legacy_offset {
                    item.set(self.tz_path(), Value::Int(offset));
                }
            }
            // unparseable input clears rather than raising
            None => {
                item.set(&self.path, Value::Null);
                if self.legacy_offset.is_some() {
                    item.set(self.tz_path(), Value::Null);
                }
            }
        }
    }

    fn format(&self, item: &Document) -> String {
        let Some(ts) = item.get(&self.path).as_timestamp() else {
            return String::new();
        };

        let pattern = self.display.as_deref().unwrap_or(match self.granularity {
            Granularity::DateOnly => DATE_DISPLAY,
            Granularity::DateTime => "[year]-[month]-[day] [hour]:[minute]:[second]",
        });

        ts.format_with(pattern).unwrap_or_else(|| ts.to_string())
    }

    fn filter(&self, spec: &FilterSpec) -> Option<Predicate> {
        Some(date_filter(&self.path, &self.formats, spec))
    }

    /// Legacy correction: a value stored as if local time were UTC is
    /// re-read at the configured offset. Only when opted in.
    fn get_data(&self, item: &Document) -> Value {
        let stored = item.get(&self.path);
        match (self.legacy_offset, stored.as_timestamp()) {
            (Some(offset), Some(ts)) => Value::Timestamp(ts.offset_by_minutes(-offset)),
            _ => stored.clone(),
        }
    }

    fn contributes(&self) -> Vec<Contribution> {
        let mut contributions = vec![Contribution::Stored {
            path: self.path.clone(),
            kind: ValueKind::Timestamp,
        }];

        if self.legacy_offset.is_some() {
            contributions.push(Contribution::Stored {
                path: self.tz_path(),
                kind: ValueKind::Int,
            });
        }

        contributions
    }
}

///
/// DateArrayKind
///

#[derive(Debug)]
pub struct DateArrayKind {
    path: String,
    formats: DateFormats,
    separator: String,
}

impl DateArrayKind {
    pub(crate) fn build(ctx: &FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError> {
        Ok(Arc::new(Self {
            path: ctx.path.to_string(),
            formats: configured_formats(ctx)?,
            separator: ctx
                .options
                .extra_str("separator")
                .unwrap_or(DEFAULT_SEPARATOR)
                .to_string(),
        }))
    }
}

impl FieldKind for DateArrayKind {
    fn type_id(&self) -> &'static str {
        "datearray"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::List
    }

    fn consumed_keys(&self) -> &'static [&'static str] {
        &["formats", "separator"]
    }

    fn validate_input(&self, data: &Value) -> bool {
        match data {
            Value::Null => true,
            Value::List(items) => items
                .iter()
                .all(|item| item.is_missing() || parse_with(&self.formats, item).is_some()),
            other => parse_with(&self.formats, other).is_some(),
        }
    }

    fn update_item(&self, item: &mut Document, data: &Value) {
        let members: Vec<Value> = match data {
            Value::List(items) => items
                .iter()
                .filter_map(|item| parse_with(&self.formats, item))
                .map(Value::Timestamp)
                .collect(),
            other => parse_with(&self.formats, other)
                .map(Value::Timestamp)
                .into_iter()
                .collect(),
        };

        if members.is_empty() {
            item.set(&self.path, Value::Null);
        } else {
            item.set(&self.path, Value::List(members));
        }
    }

    fn format(&self, item: &Document) -> String {
        item.get(&self.path).display_with(&self.separator)
    }

    fn filter(&self, spec: &FilterSpec) -> Option<Predicate> {
        Some(date_filter(&self.path, &self.formats, spec))
    }
}

///
/// TESTS
///
