use crate::{
    document::Document,
    value::{TextMode, Value},
};
use serde::Serialize;
use std::{
    cmp::Ordering,
    ops::{BitAnd, BitOr, Not},
};

///
/// Cmp
///
/// Comparator vocabulary for a single clause. Text comparators carry an
/// explicit case mode; admin-facing filters always fold case.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Cmp {
    Eq,
    EqCi,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    ContainsCi,
    StartsWithCi,
    EndsWithCi,
    In,
    NotIn,
    IsMissing,
    IsPresent,
}

///
/// Clause
/// A basic comparison: `path cmp value`.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Clause {
    pub path: String,
    pub cmp: Cmp,
    pub value: Value,
}

impl Clause {
    #[must_use]
    pub fn new(path: impl Into<String>, cmp: Cmp, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            cmp,
            value: value.into(),
        }
    }

    fn eval(&self, doc: &Document) -> bool {
        let stored = doc.get(&self.path);

        match self.cmp {
            Cmp::Eq => stored.eq_loose(&self.value),
            Cmp::EqCi => stored
                .text_eq(&self.value, TextMode::Ci)
                .unwrap_or_else(|| stored.eq_loose(&self.value)),
            Cmp::Ne => !stored.eq_loose(&self.value),
            Cmp::Lt => Self::ordered(stored, &self.value, Ordering::is_lt),
            Cmp::Lte => Self::ordered(stored, &self.value, Ordering::is_le),
            Cmp::Gt => Self::ordered(stored, &self.value, Ordering::is_gt),
            Cmp::Gte => Self::ordered(stored, &self.value, Ordering::is_ge),
            Cmp::Contains => stored.contains(&self.value, TextMode::Cs),
            Cmp::ContainsCi => stored.contains(&self.value, TextMode::Ci),
            Cmp::StartsWithCi => stored
                .text_starts_with(&self.value, TextMode::Ci)
                .unwrap_or(false),
            Cmp::EndsWithCi => stored
                .text_ends_with(&self.value, TextMode::Ci)
                .unwrap_or(false),
            Cmp::In => self
                .value
                .as_list()
                .is_some_and(|haystack| stored.in_list(haystack)),
            Cmp::NotIn => !self
                .value
                .as_list()
                .is_some_and(|haystack| stored.in_list(haystack)),
            Cmp::IsMissing => stored.is_missing(),
            Cmp::IsPresent => !stored.is_missing(),
        }
    }

    fn ordered(stored: &Value, wanted: &Value, test: fn(Ordering) -> bool) -> bool {
        stored.cmp_order(wanted).is_some_and(test)
    }
}

///
/// Predicate
///
/// Backend-agnostic condition tree produced by filter translation.
///
/// Predicates can be:
/// - `True` or `False` constants
/// - Single clauses comparing a path with a value
/// - Composite expressions: `And`, `Or`, and negation `Not`.
///

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub enum Predicate {
    #[default]
    True,
    False,
    Clause(Clause),
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
}

impl Predicate {
    // --- Clause ---

    pub fn clause(path: impl Into<String>, cmp: Cmp, value: impl Into<Value>) -> Self {
        Self::Clause(Clause::new(path, cmp, value))
    }

    // --- Equality ---

    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(path, Cmp::Eq, value)
    }

    pub fn eq_ci(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(path, Cmp::EqCi, value)
    }

    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(path, Cmp::Ne, value)
    }

    // --- Ordering ---

    pub fn lt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(path, Cmp::Lt, value)
    }

    pub fn lte(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(path, Cmp::Lte, value)
    }

    pub fn gt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(path, Cmp::Gt, value)
    }

    pub fn gte(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(path, Cmp::Gte, value)
    }

    /// Inclusive range on both bounds.
    pub fn between(
        path: impl Into<String> + Clone,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self::gte(path.clone(), low).and(Self::lte(path, high))
    }

    // --- Text ---

    pub fn contains(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(path, Cmp::Contains, value)
    }

    pub fn contains_ci(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(path, Cmp::ContainsCi, value)
    }

    pub fn starts_with_ci(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(path, Cmp::StartsWithCi, value)
    }

    pub fn ends_with_ci(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(path, Cmp::EndsWithCi, value)
    }

    // --- Presence ---

    pub fn is_missing(path: impl Into<String>) -> Self {
        Self::clause(path, Cmp::IsMissing, Value::Null)
    }

    pub fn is_present(path: impl Into<String>) -> Self {
        Self::clause(path, Cmp::IsPresent, Value::Null)
    }

    // --- Membership ---

    pub fn in_iter<I>(path: impl Into<String>, vals: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::clause(
            path,
            Cmp::In,
            Value::List(vals.into_iter().map(Into::into).collect()),
        )
    }

    pub fn not_in_iter<I>(path: impl Into<String>, vals: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::clause(
            path,
            Cmp::NotIn,
            Value::List(vals.into_iter().map(Into::into).collect()),
        )
    }

    // --- Combinators ---

    /// Combine two predicates into an `And`, flattening nested `And`s
    /// (`(a AND b) AND c` becomes `AND[a,b,c]`).
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::And(mut a), Self::And(mut b)) => {
                a.append(&mut b);
                Self::And(a)
            }
            (Self::And(mut a), b) => {
                a.push(b);
                Self::And(a)
            }
            (a, Self::And(mut b)) => {
                let mut list = vec![a];
                list.append(&mut b);
                Self::And(list)
            }
            (a, b) => Self::And(vec![a, b]),
        }
    }

    /// Combine two predicates into an `Or`, flattening nested `Or`s.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::Or(mut a), Self::Or(mut b)) => {
                a.append(&mut b);
                Self::Or(a)
            }
            (Self::Or(mut a), b) => {
                a.push(b);
                Self::Or(a)
            }
            (a, Self::Or(mut b)) => {
                let mut list = vec![a];
                list.append(&mut b);
                Self::Or(list)
            }
            (a, b) => Self::Or(vec![a, b]),
        }
    }

    /// Negate this predicate.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    #[must_use]
    pub fn and_option(self, other: Option<Self>) -> Self {
        match other {
            Some(p) => self.and(p),
            None => self,
        }
    }

    /// Re-key every clause under `prefix.` — used when a filter
    /// translated against a related list applies to the populated
    /// sub-document paths of this one.
    #[must_use]
    pub fn prefix_paths(self, prefix: &str) -> Self {
        match self {
            Self::Clause(mut clause) => {
                clause.path = format!("{prefix}.{}", clause.path);
                Self::Clause(clause)
            }
            Self::And(children) => Self::And(
                children
                    .into_iter()
                    .map(|c| c.prefix_paths(prefix))
                    .collect(),
            ),
            Self::Or(children) => Self::Or(
                children
                    .into_iter()
                    .map(|c| c.prefix_paths(prefix))
                    .collect(),
            ),
            Self::Not(inner) => Self::Not(Box::new(inner.prefix_paths(prefix))),
            constant => constant,
        }
    }

    // --- Evaluation ---

    /// Evaluate against a document. Missing paths read as `Null`, so
    /// negations correctly match documents lacking the path entirely.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::Clause(clause) => clause.eval(doc),
            Self::And(children) => children.iter().all(|c| c.matches(doc)),
            Self::Or(children) => children.iter().any(|c| c.matches(doc)),
            Self::Not(inner) => !inner.matches(doc),
        }
    }

    // --- Simplification ---

    /// Simplify recursively:
    /// - eliminate double negation `NOT NOT x` -> `x`
    /// - apply De Morgan's laws under `NOT`
    /// - flatten nested `And`/`Or`
    /// - remove neutral elements and short-circuit on constants
    #[must_use]
    pub fn simplify(self) -> Self {
        match self {
            Self::Not(inner) => match *inner {
                Self::True => Self::False,
                Self::False => Self::True,
                Self::Not(inner2) => (*inner2).simplify(),
                Self::And(children) => {
                    Self::Or(children.into_iter().map(|c| c.not().simplify()).collect())
                }
                Self::Or(children) => {
                    Self::And(children.into_iter().map(|c| c.not().simplify()).collect())
                }
                x @ Self::Clause(_) => Self::Not(Box::new(x)),
            },

            Self::And(children) => {
                let flat = Self::simplify_children(children, |p| matches!(p, Self::And(_)));

                if flat.iter().any(|p| matches!(p, Self::False)) {
                    Self::False
                } else {
                    let filtered: Vec<_> = flat
                        .into_iter()
                        .filter(|p| !matches!(p, Self::True))
                        .collect();

                    match filtered.len() {
                        0 => Self::True,
                        1 => filtered.into_iter().next().expect("len checked"),
                        _ => Self::And(filtered),
                    }
                }
            }

            Self::Or(children) => {
                let flat = Self::simplify_children(children, |p| matches!(p, Self::Or(_)));

                if flat.iter().any(|p| matches!(p, Self::True)) {
                    Self::True
                } else {
                    let filtered: Vec<_> = flat
                        .into_iter()
                        .filter(|p| !matches!(p, Self::False))
                        .collect();

                    match filtered.len() {
                        0 => Self::False,
                        1 => filtered.into_iter().next().expect("len checked"),
                        _ => Self::Or(filtered),
                    }
                }
            }

            x => x,
        }
    }

    fn simplify_children(children: Vec<Self>, flatten_if: fn(&Self) -> bool) -> Vec<Self> {
        let mut flat = Vec::with_capacity(children.len());

        for child in children {
            let simplified = child.simplify();
            if flatten_if(&simplified) {
                if let Self::And(nested) | Self::Or(nested) = simplified {
                    flat.extend(nested);
                }
            } else {
                flat.push(simplified);
            }
        }

        flat
    }
}

///
/// Bit Operations
/// allow | & and ! on predicates
///

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl Not for Predicate {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

///
/// TESTS
///
