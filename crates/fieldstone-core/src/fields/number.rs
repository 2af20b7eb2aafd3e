use crate::{
    document::Document,
    error::EngineError,
    fields::{DEFAULT_SEPARATOR, FieldContext, FieldKind, UnderscoreMethod},
    filter::FilterSpec,
    predicate::Predicate,
    schema::ValueKind,
    value::Value,
};
use std::sync::Arc;

const MODES: &[&str] = &["equals", "gt", "lt", "between"];
const DEFAULT_MODE: &str = "equals";
const DEFAULT_PATTERN: &str = "0,0[.][000000]";

///
/// Decimals
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Decimals {
    Fixed(usize),
    UpTo(usize),
}

///
/// NumberFormat
///
/// Display pattern for numeric values: `0,0` groups thousands,
/// `0,0.00` fixes two decimals, `0,0[.][000000]` (the default) shows up
/// to six and trims trailing zeros. `format: false` disables formatting
/// entirely.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum NumberFormat {
    Disabled,
    Pattern { group: bool, decimals: Decimals },
}

impl NumberFormat {
    fn from_options(ctx: &FieldContext<'_>) -> Self {
        match ctx.options.extra_value("format") {
            Some(serde_json::Value::Bool(false)) => Self::Disabled,
            Some(serde_json::Value::String(pattern)) => Self::parse(pattern),
            _ => Self::parse(DEFAULT_PATTERN),
        }
    }

    fn parse(pattern: &str) -> Self {
        let group = pattern.contains(',');

        let decimals = pattern.find("[.]").map_or_else(
            || {
                pattern.find('.').map_or(Decimals::Fixed(0), |dot| {
                    let places = pattern[dot + 1..].chars().filter(|c| *c == '0').count();
                    Decimals::Fixed(places)
                })
            },
            |bracket| {
                let places = pattern[bracket..].chars().filter(|c| *c == '0').count();
                Decimals::UpTo(places)
            },
        );

        Self::Pattern { group, decimals }
    }

    fn render(self, v: f64) -> String {
        match self {
            Self::Disabled => v.to_string(),
            Self::Pattern { group, decimals } => {
                let (places, trim) = match decimals {
                    Decimals::Fixed(n) => (n, false),
                    Decimals::UpTo(n) => (n, true),
                };

                let mut s = format!("{v:.places$}");
                if trim && s.contains('.') {
                    s = s.trim_end_matches('0').trim_end_matches('.').to_string();
                }

                if group { group_thousands(&s) } else { s }
            }
        }
    }
}

fn group_thousands(s: &str) -> String {
    let (sign, rest) = s.strip_prefix('-').map_or(("", s), |r| ("-", r));
    let (int_part, frac_part) = rest.split_once('.').map_or((rest, None), |(i, f)| (i, Some(f)));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let mut out = String::from(sign);
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }

    out
}

/// Parse offered numeric input. Text accepts thousands separators.
#[expect(clippy::cast_precision_loss)]
fn parse_offered(data: &Value) -> Option<f64> {
    match data {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        Value::Text(s) => {
            let s = s.trim().replace(',', "");
            if s.is_empty() { None } else { s.parse().ok() }
        }
        _ => None,
    }
}

/// Stored representation: whole numbers stay `Int`, the rest `Float`.
#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn stored_value(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < (1i64 << 53) as f64 {
        Value::Int(v as i64)
    } else {
        Value::Float(v)
    }
}

fn bound(json: &serde_json::Value) -> Option<f64> {
    match json {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_offered(&Value::Text(s.clone())),
        _ => None,
    }
}

/// Shared translation for numeric filters (number, numberarray).
fn number_filter(path: &str, spec: &FilterSpec) -> Predicate {
    let mode = spec.mode_among(MODES, DEFAULT_MODE);

    let predicate = match mode {
        "between" => {
            // bounds arrive as top-level after/before or as a [low, high] pair
            let (low, high) = match spec.value.as_array() {
                Some(pair) if pair.len() == 2 => (bound(&pair[0]), bound(&pair[1])),
                _ => (bound(&spec.after), bound(&spec.before)),
            };

            match (low, high) {
                (Some(low), Some(high)) => Predicate::between(path, low, high),
                (Some(low), None) => Predicate::gte(path, low),
                (None, Some(high)) => Predicate::lte(path, high),
                (None, None) => Predicate::True,
            }
        }
        "gt" | "lt" => match bound(&spec.value) {
            Some(v) if mode == "gt" => Predicate::gt(path, v),
            Some(v) => Predicate::lt(path, v),
            None => Predicate::True,
        },
        _ => match bound(&spec.value) {
            Some(v) => Predicate::eq(path, v),
            None => Predicate::is_missing(path),
        },
    };

    spec.apply_inversion(predicate)
}

///
/// NumberKind
///

#[derive(Clone, Debug)]
pub struct NumberKind {
    path: String,
    min: Option<f64>,
    max: Option<f64>,
    format: NumberFormat,
}

impl NumberKind {
    pub(crate) fn build(ctx: &FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError> {
        let min = ctx.options.extra_f64("min");
        let max = ctx.options.extra_f64("max");

        if let (Some(min), Some(max)) = (min, max)
            && min > max
        {
            return Err(ctx.invalid(format!("min {min} exceeds max {max}")));
        }

        Ok(Arc::new(Self {
            path: ctx.path.to_string(),
            min,
            max,
            format: NumberFormat::from_options(ctx),
        }))
    }

    fn in_range(&self, v: f64) -> bool {
        self.min.is_none_or(|min| v >= min) && self.max.is_none_or(|max| v <= max)
    }
}

impl FieldKind for NumberKind {
    fn type_id(&self) -> &'static str {
        "number"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Float
    }

    fn consumed_keys(&self) -> &'static [&'static str] {
        &["min", "max", "format"]
    }

    fn validate_input(&self, data: &Value) -> bool {
        match data {
            Value::Null => true,
            Value::Text(s) if s.trim().is_empty() => true,
            other => parse_offered(other).is_some_and(|v| self.in_range(v)),
        }
    }

    fn update_item(&self, item: &mut Document, data: &Value) {
        // unparseable input clears the value; a permissive upsert must
        // not turn a partial form save into a fatal error
        match parse_offered(data) {
            Some(v) => item.set(&self.path, stored_value(v)),
            None => item.set(&self.path, Value::Null),
        }
    }

    fn format(&self, item: &Document) -> String {
        match parse_offered(item.get(&self.path)) {
            Some(v) => self.format.render(v),
            None => String::new(),
        }
    }

    fn filter(&self, spec: &FilterSpec) -> Option<Predicate> {
        Some(number_filter(&self.path, spec))
    }

    fn underscore(&self) -> Vec<UnderscoreMethod> {
        let path = self.path.clone();
        let format = self.format;

        vec![UnderscoreMethod::new("format", move |doc, _args| {
            let rendered = parse_offered(doc.get(&path)).map_or_else(String::new, |v| format.render(v));
            Ok(Value::Text(rendered))
        })]
    }
}

///
/// NumberArrayKind
///

#[derive(Clone, Debug)]
pub struct NumberArrayKind {
    path: String,
    separator: String,
    format: NumberFormat,
}

impl NumberArrayKind {
    pub(crate) fn build(ctx: &FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError> {
        Ok(Arc::new(Self {
            path: ctx.path.to_string(),
            separator: ctx
                .options
                .extra_str("separator")
                .unwrap_or(DEFAULT_SEPARATOR)
                .to_string(),
            format: NumberFormat::from_options(ctx),
        }))
    }
}

impl FieldKind for NumberArrayKind {
    fn type_id(&self) -> &'static str {
        "numberarray"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::List
    }

    fn consumed_keys(&self) -> &'static [&'static str] {
        &["separator", "format"]
    }

    fn validate_input(&self, data: &Value) -> bool {
        match data {
            Value::Null => true,
            Value::List(items) => items.iter().all(|item| {
                item.is_missing() || parse_offered(item).is_some()
            }),
            other => parse_offered(other).is_some(),
        }
    }

    fn update_item(&self, item: &mut Document, data: &Value) {
        let members: Vec<Value> = match data {
            Value::List(items) => items.iter().filter_map(parse_offered).map(stored_value).collect(),
            other => parse_offered(other).map(stored_value).into_iter().collect(),
        };

        if members.is_empty() {
            item.set(&self.path, Value::Null);
        } else {
            item.set(&self.path, Value::List(members));
        }
    }

    fn format(&self, item: &Document) -> String {
        item.get(&self.path).as_list().map_or_else(String::new, |items| {
            items
                .iter()
                .filter_map(parse_offered)
                .map(|v| self.format.render(v))
                .collect::<Vec<_>>()
                .join(&self.separator)
        })
    }

    fn filter(&self, spec: &FilterSpec) -> Option<Predicate> {
        Some(number_filter(&self.path, spec))
    }
}

///
/// TESTS
///
