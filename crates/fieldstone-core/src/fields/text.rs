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

const MODES: &[&str] = &["contains", "exactly", "beginsWith", "endsWith"];
const DEFAULT_MODE: &str = "contains";
const DEFAULT_APPEND: &str = "…";

///
/// TextValidation
///
/// Length rules shared by every text-shaped type (text, textarea, html,
/// textarray members). Shared by composition; there is no subtype chain.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct TextValidation {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl TextValidation {
    pub(crate) fn from_options(ctx: &FieldContext<'_>) -> Result<Self, EngineError> {
        let min = ctx.options.extra_u64("min").and_then(|n| usize::try_from(n).ok());
        let max = ctx.options.extra_u64("max").and_then(|n| usize::try_from(n).ok());

        if let (Some(min), Some(max)) = (min, max)
            && min > max
        {
            return Err(ctx.invalid(format!("min length {min} exceeds max length {max}")));
        }

        Ok(Self { min, max })
    }

    /// Length checked in characters, after trimming.
    #[must_use]
    pub fn accepts(&self, s: &str) -> bool {
        let len = s.trim().chars().count();
        if len == 0 {
            // emptiness is the required-check's concern, not a length failure
            return true;
        }

        self.min.is_none_or(|min| len >= min) && self.max.is_none_or(|max| len <= max)
    }
}

/// Truncate `s` to at most `length` characters. With `preserve_words`,
/// the cut backs up to the last whitespace boundary before the limit so
/// no partial word survives. `append` is added only when truncation
/// happened; the result is at most `length` + `append` characters.
/// Boundaries are `char`s, so a multi-byte scalar is never split.
#[must_use]
pub fn crop(s: &str, length: usize, append: &str, preserve_words: bool) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= length {
        return s.to_string();
    }

    let mut cut = length;
    if preserve_words && length > 0 && !chars[length].is_whitespace() {
        if let Some(boundary) = chars[..length].iter().rposition(|c| c.is_whitespace()) {
            cut = boundary;
        }
    }

    let kept: String = chars[..cut].iter().collect();
    let mut out = kept.trim_end().to_string();
    out.push_str(append);
    out
}

///
/// TextStyle
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TextStyle {
    Plain,
    Multiline,
    Html,
}

impl TextStyle {
    const fn type_id(self) -> &'static str {
        match self {
            Self::Plain => "text",
            Self::Multiline => "textarea",
            Self::Html => "html",
        }
    }
}

///
/// TextKind
///

#[derive(Clone, Debug)]
pub struct TextKind {
    path: String,
    style: TextStyle,
    validation: TextValidation,
}

impl TextKind {
    pub(crate) fn build_plain(ctx: &FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError> {
        Self::build_styled(ctx, TextStyle::Plain)
    }

    pub(crate) fn build_multiline(
        ctx: &FieldContext<'_>,
    ) -> Result<Arc<dyn FieldKind>, EngineError> {
        Self::build_styled(ctx, TextStyle::Multiline)
    }

    pub(crate) fn build_html(ctx: &FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError> {
        Self::build_styled(ctx, TextStyle::Html)
    }

    fn build_styled(
        ctx: &FieldContext<'_>,
        style: TextStyle,
    ) -> Result<Arc<dyn FieldKind>, EngineError> {
        Ok(Arc::new(Self {
            path: ctx.path.to_string(),
            style,
            validation: TextValidation::from_options(ctx)?,
        }))
    }
}

/// Translate a text filter. Shared with textarray, which applies the
/// same modes over list members.
fn text_filter(path: &str, spec: &FilterSpec) -> Predicate {
    let mode = spec.mode_among(MODES, DEFAULT_MODE);

    let predicate = if spec.value_is_empty() {
        // "no filter value typed yet" means presence matching, not
        // literal empty-string equality
        Predicate::is_missing(path)
    } else {
        let needle = spec.value_texts().join(" ");
        match mode {
            "exactly" => Predicate::eq_ci(path, needle),
            "beginsWith" => Predicate::starts_with_ci(path, needle),
            "endsWith" => Predicate::ends_with_ci(path, needle),
            _ => Predicate::contains_ci(path, needle),
        }
    };

    spec.apply_inversion(predicate)
}

fn offered_text(data: &Value) -> Option<String> {
    match data {
        Value::Null | Value::List(_) => None,
        other => Some(other.display_with(DEFAULT_SEPARATOR)),
    }
}

impl FieldKind for TextKind {
    fn type_id(&self) -> &'static str {
        self.style.type_id()
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn consumed_keys(&self) -> &'static [&'static str] {
        &["min", "max"]
    }

    fn validate_input(&self, data: &Value) -> bool {
        match data {
            Value::Null => true,
            Value::List(_) => false,
            other => self
                .validation
                .accepts(&other.display_with(DEFAULT_SEPARATOR)),
        }
    }

    fn update_item(&self, item: &mut Document, data: &Value) {
        match offered_text(data) {
            Some(s) if !s.is_empty() => item.set(&self.path, s),
            _ => item.set(&self.path, Value::Null),
        }
    }

    fn filter(&self, spec: &FilterSpec) -> Option<Predicate> {
        Some(text_filter(&self.path, spec))
    }

    fn underscore(&self) -> Vec<UnderscoreMethod> {
        let path = self.path.clone();

        vec![UnderscoreMethod::new("crop", move |doc, args| {
            let length = match args.first() {
                Some(Value::Int(n)) if *n >= 0 => *n as usize,
                _ => {
                    return Err(EngineError::ValidationFailed {
                        field: path.clone(),
                        reason: "crop requires a non-negative length".to_string(),
                    });
                }
            };
            let append = args
                .get(1)
                .and_then(Value::as_text)
                .unwrap_or(DEFAULT_APPEND);
            let preserve_words = args.get(2).and_then(Value::as_bool).unwrap_or(false);

            let stored = doc.get(&path).as_text().unwrap_or_default().to_string();
            Ok(Value::Text(crop(&stored, length, append, preserve_words)))
        })]
    }
}

///
/// TextArrayKind
///

#[derive(Clone, Debug)]
pub struct TextArrayKind {
    path: String,
    validation: TextValidation,
    separator: String,
}

impl TextArrayKind {
    pub(crate) fn build(ctx: &FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError> {
        Ok(Arc::new(Self {
            path: ctx.path.to_string(),
            validation: TextValidation::from_options(ctx)?,
            separator: ctx
                .options
                .extra_str("separator")
                .unwrap_or(DEFAULT_SEPARATOR)
                .to_string(),
        }))
    }

    fn normalize(data: &Value) -> Option<Vec<Value>> {
        match data {
            Value::Null => None,
            Value::List(items) => Some(
                items
                    .iter()
                    .filter_map(offered_text)
                    .filter(|s| !s.is_empty())
                    .map(Value::Text)
                    .collect(),
            ),
            other => offered_text(other)
                .filter(|s| !s.is_empty())
                .map(|s| vec![Value::Text(s)]),
        }
    }
}

impl FieldKind for TextArrayKind {
    fn type_id(&self) -> &'static str {
        "textarray"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::List
    }

    fn consumed_keys(&self) -> &'static [&'static str] {
        &["min", "max", "separator"]
    }

    fn validate_input(&self, data: &Value) -> bool {
        match data {
            Value::Null => true,
            Value::List(items) => items
                .iter()
                .filter_map(offered_text)
                .all(|s| self.validation.accepts(&s)),
            other => self
                .validation
                .accepts(&other.display_with(DEFAULT_SEPARATOR)),
        }
    }

    fn update_item(&self, item: &mut Document, data: &Value) {
        match Self::normalize(data) {
            Some(items) if !items.is_empty() => item.set(&self.path, Value::List(items)),
            _ => item.set(&self.path, Value::Null),
        }
    }

    fn format(&self, item: &Document) -> String {
        item.get(&self.path).display_with(&self.separator)
    }

    fn filter(&self, spec: &FilterSpec) -> Option<Predicate> {
        Some(text_filter(&self.path, spec))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldOptions;
    use proptest::prelude::*;

    fn kind(options: FieldOptions) -> Arc<dyn FieldKind> {
        let ctx = FieldContext {
            list_key: "Post",
            path: "title",
            options: &options,
        };
        TextKind::build_plain(&ctx).unwrap()
    }

    #[test]
    fn absent_input_is_always_valid() {
        let kind = kind(FieldOptions::new().with("max", serde_json::json!(3)));
        assert!(kind.validate_input(&Value::Null));
        assert!(kind.validate_input(&Value::Text(String::new())));
    }

    #[test]
    fn length_rules_apply_post_trim() {
        let kind = kind(
            FieldOptions::new()
                .with("min", serde_json::json!(2))
                .with("max", serde_json::json!(5)),
        );
        assert!(kind.validate_input(&Value::Text("  ab  ".into())));
        assert!(!kind.validate_input(&Value::Text("a".into())));
        assert!(!kind.validate_input(&Value::Text("abcdef".into())));
    }

    #[test]
    fn min_above_max_is_a_config_error() {
        let options = FieldOptions::new()
            .with("min", serde_json::json!(9))
            .with("max", serde_json::json!(3));
        let ctx = FieldContext {
            list_key: "Post",
            path: "title",
            options: &options,
        };
        assert!(TextKind::build_plain(&ctx).is_err());
    }

    #[test]
    fn update_stores_text_and_clears_on_empty() {
        let kind = kind(FieldOptions::new());
        let mut doc = Document::new();
        kind.update_item(&mut doc, &Value::Text("hello".into()));
        assert_eq!(doc.get("title"), &Value::Text("hello".into()));
        kind.update_item(&mut doc, &Value::Text(String::new()));
        assert!(doc.get("title").is_missing());
    }

    #[test]
    fn crop_preserves_words() {
        let out = crop("the quick brown fox", 12, "...", true);
        assert_eq!(out, "the quick...");
    }

    #[test]
    fn crop_hard_cuts_without_preserve() {
        let out = crop("the quick brown fox", 12, "...", false);
        assert_eq!(out, "the quick br...");
    }

    #[test]
    fn crop_returns_input_when_short_enough() {
        assert_eq!(crop("short", 10, "...", true), "short");
    }

    #[test]
    fn crop_keeps_a_word_that_ends_exactly_at_the_limit() {
        // char 9 (the limit) is the space after "quick"
        assert_eq!(crop("the quick brown", 9, "…", true), "the quick…");
    }

    #[test]
    fn crop_handles_multibyte_input() {
        let out = crop("héllo wörld ünd möre", 12, "…", true);
        assert_eq!(out, "héllo wörld…");
    }

    #[test]
    fn filter_empty_value_matches_missing() {
        let kind = kind(FieldOptions::new());
        let p = kind.filter(&FilterSpec::default()).unwrap();
        assert_eq!(p, Predicate::is_missing("title"));
    }

    #[test]
    fn filter_modes_translate() {
        let kind = kind(FieldOptions::new());
        let spec = FilterSpec::with_mode("beginsWith", serde_json::json!("he"));
        assert_eq!(
            kind.filter(&spec).unwrap(),
            Predicate::starts_with_ci("title", "he")
        );

        let inverted = FilterSpec::with_value(serde_json::json!("x")).invert();
        assert_eq!(
            kind.filter(&inverted).unwrap(),
            Predicate::contains_ci("title", "x").not()
        );
    }

    #[test]
    fn underscore_crop_runs_against_the_document() {
        let kind = kind(FieldOptions::new());
        let mut doc = Document::new();
        doc.set("title", "the quick brown fox");

        let methods = kind.underscore();
        let crop_method = methods.iter().find(|m| m.name == "crop").unwrap();
        let out = (crop_method.run)(
            &doc,
            &[Value::Int(12), Value::Text("...".into()), Value::Bool(true)],
        )
        .unwrap();
        assert_eq!(out, Value::Text("the quick...".into()));
    }

    #[test]
    fn textarray_normalizes_and_joins() {
        let options = FieldOptions::new().with("separator", serde_json::json!(" / "));
        let ctx = FieldContext {
            list_key: "Post",
            path: "tags",
            options: &options,
        };
        let kind = TextArrayKind::build(&ctx).unwrap();

        let mut doc = Document::new();
        kind.update_item(&mut doc, &Value::from_list(vec!["a", "", "b"]));
        assert_eq!(doc.get("tags"), &Value::from_list(vec!["a", "b"]));
        assert_eq!(kind.format(&doc), "a / b");
    }

    proptest! {
        #[test]
        fn crop_never_exceeds_length_plus_append(s in ".{0,64}", n in 0usize..32) {
            let out = crop(&s, n, "...", true);
            if s.chars().count() <= n {
                prop_assert_eq!(out, s);
            } else {
                prop_assert!(out.chars().count() <= n + "...".chars().count());
            }
        }

        #[test]
        fn crop_never_splits_words_when_preserving(
            words in proptest::collection::vec("[a-z]{1,8}", 1..8),
            n in 1usize..24,
        ) {
            let s = words.join(" ");
            let out = crop(&s, n, "", true);
            // with a whitespace boundary before the limit, every word
            // in the output must be a whole input word
            let has_boundary = s.chars().take(n).any(char::is_whitespace);
            if s.chars().count() > n && !has_boundary {
                return Ok(());
            }
            for word in out.split_whitespace() {
                prop_assert!(words.iter().any(|w| w == word));
            }
        }
    }
}
