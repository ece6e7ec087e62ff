//! Query rule values and their builders.
//!
//! A [`Query`] is an immutable bundle of accumulated rules: filter clauses
//! combined as a conjunction, order-by rules applied left to right, and an
//! optional result limit. Builder methods take `&self` and return a new
//! query with the rule appended, so existing query values are never
//! mutated and partial queries can be reused as starting points.
//!
//! Execution lives in the engine crate; this module only describes what to
//! execute.

use bson::Bson;

use crate::{
    error::{StoreError, StoreResult},
    path::{FieldPath, FieldRef},
};

/// Comparison operators usable in a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to (normalized equality: integer and float forms of the same
    /// number compare equal).
    Eq,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// The array field contains the value.
    ArrayContains,
}

/// Sort direction for an order-by rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (0 to 9, A to Z).
    Asc,
    /// Descending order (9 to 0, Z to A).
    Desc,
}

/// A single filter clause: field, operator, comparison value.
#[derive(Debug, Clone)]
pub struct WhereFilter {
    /// The field the clause examines.
    pub field: FieldPath,
    /// The comparison operator.
    pub op: FieldOp,
    /// The value to compare against.
    pub value: Bson,
}

/// A single order-by rule.
#[derive(Debug, Clone)]
pub struct SortRule {
    /// The field to sort by.
    pub field: FieldPath,
    /// The sort direction.
    pub direction: SortDirection,
}

/// An accumulated, immutable set of query rules.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Filter clauses, combined as a conjunction.
    pub filters: Vec<WhereFilter>,
    /// Order-by rules; each rule breaks ties left by the previous one.
    pub order_by: Vec<SortRule>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates a query with no rules.
    pub fn new() -> Self {
        Query::default()
    }

    /// Returns a new query with a filter clause appended.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::InvalidFieldPath`] when a dotted field
    /// string cannot be parsed.
    pub fn filter(
        &self,
        field: impl Into<FieldRef>,
        op: FieldOp,
        value: impl Into<Bson>,
    ) -> StoreResult<Query> {
        let mut next = self.clone();
        next.filters.push(WhereFilter {
            field: field.into().into_path()?,
            op,
            value: value.into(),
        });
        Ok(next)
    }

    /// Returns a new query with an order-by rule appended.
    pub fn order_by(
        &self,
        field: impl Into<FieldRef>,
        direction: SortDirection,
    ) -> StoreResult<Query> {
        let mut next = self.clone();
        next.order_by.push(SortRule {
            field: field.into().into_path()?,
            direction,
        });
        Ok(next)
    }

    /// Returns a new query with the result limit set.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::InvalidQuery`] immediately when `limit` is
    /// zero or negative; the error is not deferred to execution.
    pub fn limit(&self, limit: i64) -> StoreResult<Query> {
        if limit <= 0 {
            return Err(StoreError::InvalidQuery(format!(
                "limit must be positive, got {limit}"
            )));
        }
        let mut next = self.clone();
        next.limit = Some(limit as usize);
        Ok(next)
    }

    /// Cursor lower bound: deliberately unsupported.
    pub fn start_at(&self) -> StoreResult<Query> {
        Err(StoreError::Unsupported("start_at"))
    }

    /// Exclusive cursor lower bound: deliberately unsupported.
    pub fn start_after(&self) -> StoreResult<Query> {
        Err(StoreError::Unsupported("start_after"))
    }

    /// Cursor upper bound: deliberately unsupported.
    pub fn end_at(&self) -> StoreResult<Query> {
        Err(StoreError::Unsupported("end_at"))
    }

    /// Exclusive cursor upper bound: deliberately unsupported.
    pub fn end_before(&self) -> StoreResult<Query> {
        Err(StoreError::Unsupported("end_before"))
    }
}
