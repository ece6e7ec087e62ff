//! Query execution: filtering, ordering, and truncation over a snapshot of
//! documents.
//!
//! Filtering normalizes values through [`Comparable`] so integer and float
//! forms of the same number compare equal. Ordering extracts one typed sort
//! key per document per rule up front; a present value that is neither a
//! number nor a string fails there, and mixing numbers and strings under
//! one rule is likewise an error rather than an arbitrary ranking.

use std::cmp::Ordering;
use std::collections::HashMap;

use bson::{Bson, DateTime, Document};

use mockstore_core::{
    error::{StoreError, StoreResult},
    path::FieldPath,
    query::{FieldOp, Query, SortDirection, SortRule, WhereFilter},
};

use crate::snapshot::DocumentSnapshot;

/// Type-normalized view of a stored value, for comparisons.
///
/// All numeric widths collapse to `f64` so `2` and `2.0` compare equal, the
/// way a document database client treats them.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(value: &'a Bson) -> Self {
        match value {
            Bson::Null => Comparable::Null,
            Bson::Boolean(b) => Comparable::Bool(*b),
            Bson::Int32(n) => Comparable::Number(*n as f64),
            Bson::Int64(n) => Comparable::Number(*n as f64),
            Bson::Double(n) => Comparable::Number(*n),
            Bson::DateTime(at) => Comparable::DateTime(*at),
            Bson::String(s) => Comparable::String(s),
            Bson::Array(items) => Comparable::Array(items.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(key, value)| (key.as_str(), Comparable::from(value)))
                    .collect(),
            ),
            // Remaining value kinds are opaque: stored and returned, never
            // compared.
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Normalized equality between two stored values.
pub(crate) fn values_equal(a: &Bson, b: &Bson) -> bool {
    Comparable::from(a) == Comparable::from(b)
}

/// Walks a dotted field path into nested documents.
pub(crate) fn lookup<'a>(data: &'a Document, path: &FieldPath) -> Option<&'a Bson> {
    let mut current = data;
    let (last, parents) = path.segments().split_last()?;
    for segment in parents {
        match current.get(segment) {
            Some(Bson::Document(inner)) => current = inner,
            _ => return None,
        }
    }
    current.get(last)
}

/// Human-readable name of a value's type, for error messages.
fn type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Null => "null",
        Bson::Boolean(_) => "boolean",
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => "number",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "map",
        Bson::DateTime(_) => "datetime",
        _ => "opaque",
    }
}

/// Evaluates one filter clause against one document.
///
/// A missing field never matches. `array-contains` against a present
/// non-array field is a data-dependent error.
fn filter_matches(data: &Document, filter: &WhereFilter) -> StoreResult<bool> {
    let Some(field_value) = lookup(data, &filter.field) else {
        return Ok(false);
    };

    match filter.op {
        FieldOp::Eq => Ok(Comparable::from(field_value) == Comparable::from(&filter.value)),
        FieldOp::Lt | FieldOp::Lte | FieldOp::Gt | FieldOp::Gte => {
            match Comparable::from(field_value).partial_cmp(&Comparable::from(&filter.value)) {
                Some(ordering) => Ok(match filter.op {
                    FieldOp::Lt => ordering == Ordering::Less,
                    FieldOp::Lte => ordering != Ordering::Greater,
                    FieldOp::Gt => ordering == Ordering::Greater,
                    FieldOp::Gte => ordering != Ordering::Less,
                    _ => unreachable!(),
                }),
                None => Ok(false),
            }
        }
        FieldOp::ArrayContains => match field_value {
            Bson::Array(items) => Ok(items.iter().any(|item| values_equal(item, &filter.value))),
            other => Err(StoreError::InvalidQuery(format!(
                "array-contains requires an array field, {} holds a {}",
                filter.field,
                type_name(other)
            ))),
        },
    }
}

/// A per-document sort key for one order-by rule.
///
/// Missing fields order before any present value; present values must all
/// be numbers or all strings within one rule.
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Missing,
    Number(f64),
    Text(String),
}

impl SortKey {
    fn extract(data: &Document, rule: &SortRule) -> StoreResult<SortKey> {
        match lookup(data, &rule.field) {
            None => Ok(SortKey::Missing),
            Some(Bson::Int32(n)) => Ok(SortKey::Number(*n as f64)),
            Some(Bson::Int64(n)) => Ok(SortKey::Number(*n as f64)),
            Some(Bson::Double(n)) => Ok(SortKey::Number(*n)),
            Some(Bson::String(s)) => Ok(SortKey::Text(s.clone())),
            Some(other) => Err(StoreError::UnsupportedSortType {
                field: rule.field.to_string(),
                type_name: type_name(other),
            }),
        }
    }

    fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
            (SortKey::Missing, _) => Ordering::Less,
            (_, SortKey::Missing) => Ordering::Greater,
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            // Mixed number/string keys are rejected before sorting begins.
            _ => Ordering::Equal,
        }
    }
}

/// Runs a query over existing-document snapshots: filter as a conjunction,
/// sort by the rule list, truncate to the limit.
///
/// The input order is the collection's insertion order and is preserved
/// wherever no order-by rule distinguishes two documents (the sort is
/// stable).
pub(crate) fn execute(
    documents: Vec<DocumentSnapshot>,
    query: &Query,
) -> StoreResult<Vec<DocumentSnapshot>> {
    let mut matched = Vec::with_capacity(documents.len());
    for snapshot in documents {
        let data = snapshot.data().expect("query inputs are existing documents");
        let mut keep = true;
        for filter in &query.filters {
            if !filter_matches(data, filter)? {
                keep = false;
                break;
            }
        }
        if keep {
            matched.push(snapshot);
        }
    }

    if !query.order_by.is_empty() {
        let mut keyed = Vec::with_capacity(matched.len());
        for snapshot in matched {
            let data = snapshot.data().expect("query inputs are existing documents");
            let keys = query
                .order_by
                .iter()
                .map(|rule| SortKey::extract(data, rule))
                .collect::<StoreResult<Vec<_>>>()?;
            keyed.push((keys, snapshot));
        }

        // One rule must not see both numbers and strings.
        for (index, rule) in query.order_by.iter().enumerate() {
            let mut saw_number = false;
            let mut saw_text = false;
            for (keys, _) in &keyed {
                match &keys[index] {
                    SortKey::Number(_) => saw_number = true,
                    SortKey::Text(_) => saw_text = true,
                    SortKey::Missing => {}
                }
            }
            if saw_number && saw_text {
                return Err(StoreError::UnsupportedSortType {
                    field: rule.field.to_string(),
                    type_name: "mixed",
                });
            }
        }

        keyed.sort_by(|(a, _), (b, _)| {
            for (index, rule) in query.order_by.iter().enumerate() {
                let ordering = match rule.direction {
                    SortDirection::Asc => a[index].compare(&b[index]),
                    SortDirection::Desc => b[index].compare(&a[index]),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        matched = keyed.into_iter().map(|(_, snapshot)| snapshot).collect();
    }

    if let Some(limit) = query.limit {
        matched.truncate(limit);
    }
    Ok(matched)
}
