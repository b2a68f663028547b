//! Structured queries over JSON documents.
//!
//! `Filter`, `Patch` and `FindOptions` are the whole vocabulary the collection
//! layer speaks to a `DocumentStore`. Field paths are dotted (`jobs.total`,
//! `state.hidden`) and address nested objects.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ────────────────────────────────────────────────────────────────────────────
// Filters
// ────────────────────────────────────────────────────────────────────────────

/// A predicate over documents.
///
/// Matching follows document-store conventions:
/// - `Ne` also matches documents where the field is absent.
/// - Ordered comparisons only match values of the same JSON type.
/// - `Exists(path, true)` matches a present field even if it holds `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    Exists(String, bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(path.into(), value.into())
    }

    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne(path.into(), value.into())
    }

    pub fn gt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt(path.into(), value.into())
    }

    pub fn gte(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gte(path.into(), value.into())
    }

    pub fn lt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt(path.into(), value.into())
    }

    pub fn lte(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lte(path.into(), value.into())
    }

    pub fn is_in(path: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In(path.into(), values)
    }

    pub fn exists(path: impl Into<String>, present: bool) -> Self {
        Filter::Exists(path.into(), present)
    }

    /// Conjunction, flattening nested `And`s and absorbing `All`.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, other) => other,
            (filter, Filter::All) => filter,
            (Filter::And(mut filters), other) => {
                filters.push(other);
                Filter::And(filters)
            }
            (filter, other) => Filter::And(vec![filter, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut filters) => {
                filters.push(other);
                Filter::Or(filters)
            }
            filter => Filter::Or(vec![filter, other]),
        }
    }

    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Evaluates the filter against one document.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(path, expected) => {
                lookup(document, path).is_some_and(|v| values_equal(v, expected))
            }
            Filter::Ne(path, expected) => {
                !lookup(document, path).is_some_and(|v| values_equal(v, expected))
            }
            Filter::Gt(path, bound) => {
                compare_same_type(lookup(document, path), bound) == Some(Ordering::Greater)
            }
            Filter::Gte(path, bound) => matches!(
                compare_same_type(lookup(document, path), bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::Lt(path, bound) => {
                compare_same_type(lookup(document, path), bound) == Some(Ordering::Less)
            }
            Filter::Lte(path, bound) => matches!(
                compare_same_type(lookup(document, path), bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Filter::In(path, candidates) => lookup(document, path)
                .is_some_and(|v| candidates.iter().any(|c| values_equal(v, c))),
            Filter::Exists(path, present) => lookup(document, path).is_some() == *present,
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(document)),
            Filter::Not(inner) => !inner.matches(document),
        }
    }

    /// Every field path referenced by the filter, in order of appearance.
    pub fn field_paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, paths: &mut Vec<&'a str>) {
        match self {
            Filter::All => {}
            Filter::Eq(path, _)
            | Filter::Ne(path, _)
            | Filter::Gt(path, _)
            | Filter::Gte(path, _)
            | Filter::Lt(path, _)
            | Filter::Lte(path, _)
            | Filter::In(path, _)
            | Filter::Exists(path, _) => paths.push(path),
            Filter::And(filters) | Filter::Or(filters) => {
                for filter in filters {
                    filter.collect_paths(paths);
                }
            }
            Filter::Not(inner) => inner.collect_paths(paths),
        }
    }
}

/// Renders the filter in the familiar `{field: {$op: value}}` notation, used in
/// logs and error messages.
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => write!(f, "{{}}"),
            Filter::Eq(path, v) => write!(f, "{{{path}: {{$eq: {v}}}}}"),
            Filter::Ne(path, v) => write!(f, "{{{path}: {{$ne: {v}}}}}"),
            Filter::Gt(path, v) => write!(f, "{{{path}: {{$gt: {v}}}}}"),
            Filter::Gte(path, v) => write!(f, "{{{path}: {{$gte: {v}}}}}"),
            Filter::Lt(path, v) => write!(f, "{{{path}: {{$lt: {v}}}}}"),
            Filter::Lte(path, v) => write!(f, "{{{path}: {{$lte: {v}}}}}"),
            Filter::In(path, values) => {
                write!(f, "{{{path}: {{$in: {}}}}}", Value::Array(values.clone()))
            }
            Filter::Exists(path, present) => write!(f, "{{{path}: {{$exists: {present}}}}}"),
            Filter::And(filters) => write_list(f, "$and", filters),
            Filter::Or(filters) => write_list(f, "$or", filters),
            Filter::Not(inner) => write!(f, "{{$not: {inner}}}"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, op: &str, filters: &[Filter]) -> fmt::Result {
    write!(f, "{{{op}: [")?;
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{filter}")?;
    }
    write!(f, "]}}")
}

/// Resolves a dotted path inside a document.
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |value, segment| value.get(segment))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_same_type(value: Option<&Value>, bound: &Value) -> Option<Ordering> {
    match (value?, bound) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order used when sorting listings. Missing and `null` values come
/// first, then numbers, strings, objects, arrays and booleans.
pub fn sort_ordering(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Object(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Bool(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Partial updates
// ────────────────────────────────────────────────────────────────────────────

/// A partial update: an ordered list of `$set` assignments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    sets: Vec<(String, Value)>,
}

impl Patch {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_set(path, value)
    }

    pub fn and_set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sets.push((path.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.sets.iter().map(|(path, _)| path.as_str())
    }

    /// Applies every assignment in order, creating intermediate objects.
    pub fn apply(&self, document: &mut Value) {
        for (path, value) in &self.sets {
            assign(document, path, value.clone());
        }
    }
}

fn assign(target: &mut Value, path: &str, value: Value) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        match path.split_once('.') {
            None => {
                map.insert(path.to_string(), value);
            }
            Some((head, rest)) => {
                let child = map
                    .entry(head.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                assign(child, rest, value);
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Listing options
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub key: String,
    pub direction: SortDirection,
}

/// Skip/limit/sort for listings. The default lists everything in store order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub skip: u64,
    pub limit: Option<u64>,
    pub sort: Option<Sort>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort_by(mut self, key: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(Sort {
            key: key.into(),
            direction,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job() -> Value {
        json!({
            "url": "https://acme.test/jobs/1",
            "site_url": "https://acme.test",
            "state": { "hidden": true },
            "rank": 3
        })
    }

    #[test]
    fn test_eq_on_nested_path() {
        assert!(Filter::eq("state.hidden", true).matches(&job()));
        assert!(!Filter::eq("state.hidden", false).matches(&job()));
    }

    #[test]
    fn test_ne_matches_missing_field() {
        let doc = json!({ "url": "x" });
        assert!(Filter::ne("state.hidden", true).matches(&doc));
        assert!(!Filter::ne("state.hidden", true).matches(&job()));
    }

    #[test]
    fn test_comparisons_require_same_type() {
        assert!(Filter::gt("rank", 2).matches(&job()));
        assert!(Filter::gte("rank", 3.0).matches(&job()));
        assert!(!Filter::lt("rank", 3).matches(&job()));
        assert!(!Filter::gt("rank", "1").matches(&job()));
        assert!(!Filter::lt("missing", 10).matches(&job()));
    }

    #[test]
    fn test_logical_composition() {
        let filter = Filter::eq("site_url", "https://acme.test")
            .and(Filter::eq("state.hidden", false).or(Filter::gte("rank", 3)));
        assert!(filter.matches(&job()));
        assert!(!filter.clone().negate().matches(&job()));
        assert_eq!(filter.field_paths(), vec!["site_url", "state.hidden", "rank"]);
    }

    #[test]
    fn test_and_absorbs_all() {
        let filter = Filter::All.and(Filter::eq("url", "x"));
        assert_eq!(filter, Filter::eq("url", "x"));
    }

    #[test]
    fn test_in_and_exists() {
        assert!(Filter::is_in("rank", vec![json!(1), json!(3)]).matches(&job()));
        assert!(Filter::exists("state.hidden", true).matches(&job()));
        assert!(Filter::exists("state.seen", false).matches(&job()));
    }

    #[test]
    fn test_patch_creates_intermediate_objects() {
        let mut doc = json!({ "url": "https://acme.test" });
        Patch::set("jobs.total", 4)
            .and_set("jobs.unseen", 2)
            .apply(&mut doc);
        assert_eq!(doc["jobs"], json!({ "total": 4, "unseen": 2 }));
    }

    #[test]
    fn test_patch_leaves_sibling_fields() {
        let mut doc = json!({ "jobs": { "total": 4, "unseen": 2 } });
        Patch::set("jobs.unseen", 0).apply(&mut doc);
        assert_eq!(doc["jobs"], json!({ "total": 4, "unseen": 0 }));
    }

    #[test]
    fn test_display_uses_operator_notation() {
        let filter = Filter::eq("url", "a").and(Filter::ne("state.hidden", true));
        assert_eq!(
            filter.to_string(),
            r#"{$and: [{url: {$eq: "a"}}, {state.hidden: {$ne: true}}]}"#
        );
    }

    #[test]
    fn test_sort_ordering_puts_missing_first() {
        let a = json!(1);
        assert_eq!(sort_ordering(None, Some(&a)), Ordering::Less);
        assert_eq!(
            sort_ordering(Some(&json!("b")), Some(&json!("a"))),
            Ordering::Greater
        );
    }
}
