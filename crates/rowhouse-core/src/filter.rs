//! Filter predicate representation and evaluation.
//!
//! Predicates name an attribute and compare it to a literal value; the
//! reserved names [`PARTITION_KEY`], [`ROW_KEY`] and [`TIMESTAMP`] address
//! an entity's keys and server timestamp. Conjunctions combine with
//! [`Filter::And`].

use std::cmp::Ordering;

use crate::types::{AttrValue, Entity, PARTITION_KEY, ROW_KEY, TIMESTAMP};

/// A filter predicate over a single attribute, or a conjunction of
/// predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, AttrValue),
    Ne(String, AttrValue),
    Lt(String, AttrValue),
    Le(String, AttrValue),
    Gt(String, AttrValue),
    Ge(String, AttrValue),
    Between(String, AttrValue, AttrValue),
    And(Vec<Filter>),
}

impl Filter {
    /// Evaluate this filter against an entity.
    ///
    /// Comparison is type-strict: comparing values of different types is
    /// never true (and never an error). A missing attribute satisfies only
    /// `Ne`.
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Filter::Eq(name, v) => cmp_is(entity, name, v, |o| o == Ordering::Equal),
            Filter::Ne(name, v) => {
                !cmp_is(entity, name, v, |o| o == Ordering::Equal)
            }
            Filter::Lt(name, v) => cmp_is(entity, name, v, |o| o == Ordering::Less),
            Filter::Le(name, v) => cmp_is(entity, name, v, |o| o != Ordering::Greater),
            Filter::Gt(name, v) => cmp_is(entity, name, v, |o| o == Ordering::Greater),
            Filter::Ge(name, v) => cmp_is(entity, name, v, |o| o != Ordering::Less),
            Filter::Between(name, low, high) => {
                cmp_is(entity, name, low, |o| o != Ordering::Less)
                    && cmp_is(entity, name, high, |o| o != Ordering::Greater)
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(entity)),
        }
    }

    /// Flatten nested conjunctions into a list of leaf predicates.
    pub(crate) fn conjuncts(&self) -> Vec<&Filter> {
        match self {
            Filter::And(filters) => filters.iter().flat_map(|f| f.conjuncts()).collect(),
            leaf => vec![leaf],
        }
    }

    /// The partition key this filter pins by equality, if any. This is the
    /// predicate the query planner applies first.
    pub(crate) fn partition_key_eq(&self) -> Option<&str> {
        self.conjuncts().into_iter().find_map(|f| match f {
            Filter::Eq(name, AttrValue::String(v)) if name == PARTITION_KEY => Some(v.as_str()),
            _ => None,
        })
    }

    /// The remaining predicate once the first partition-key equality
    /// conjunct is consumed by a partition scan, or `None` if nothing
    /// remains.
    pub(crate) fn residual(&self) -> Option<Filter> {
        let mut seen_pk_eq = false;
        let rest: Vec<Filter> = self
            .conjuncts()
            .into_iter()
            .filter(|f| {
                let is_pk_eq = !seen_pk_eq
                    && matches!(f, Filter::Eq(name, AttrValue::String(_)) if name == PARTITION_KEY);
                if is_pk_eq {
                    seen_pk_eq = true;
                }
                !is_pk_eq
            })
            .cloned()
            .collect();
        match rest.len() {
            0 => None,
            1 => rest.into_iter().next(),
            _ => Some(Filter::And(rest)),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl Filter {
    /// `attr == value`
    pub fn eq(attr: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Filter::Eq(attr.into(), value.into())
    }

    /// `attr != value`
    pub fn ne(attr: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Filter::Ne(attr.into(), value.into())
    }

    /// `attr < value`
    pub fn lt(attr: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Filter::Lt(attr.into(), value.into())
    }

    /// `attr <= value`
    pub fn le(attr: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Filter::Le(attr.into(), value.into())
    }

    /// `attr > value`
    pub fn gt(attr: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Filter::Gt(attr.into(), value.into())
    }

    /// `attr >= value`
    pub fn ge(attr: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Filter::Ge(attr.into(), value.into())
    }

    /// `attr BETWEEN low AND high` (inclusive)
    pub fn between(
        attr: impl Into<String>,
        low: impl Into<AttrValue>,
        high: impl Into<AttrValue>,
    ) -> Self {
        Filter::Between(attr.into(), low.into(), high.into())
    }

    /// `f1 AND f2 AND ...`
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn cmp_is(
    entity: &Entity,
    name: &str,
    literal: &AttrValue,
    pred: impl Fn(Ordering) -> bool,
) -> bool {
    match resolve_attr(entity, name) {
        Some(value) => matches!(compare_values(&value, literal), Some(o) if pred(o)),
        None => false,
    }
}

/// Resolve an attribute name on an entity, treating the reserved names as
/// addressing the keys and server timestamp.
pub fn resolve_attr(entity: &Entity, name: &str) -> Option<AttrValue> {
    match name {
        PARTITION_KEY => Some(AttrValue::String(entity.partition_key.clone())),
        ROW_KEY => Some(AttrValue::String(entity.row_key.clone())),
        TIMESTAMP => entity.timestamp.map(AttrValue::Timestamp),
        _ => entity.attrs.get(name).cloned(),
    }
}

/// Compare two attribute values, returning an ordering only when the types
/// match.
pub fn compare_values(left: &AttrValue, right: &AttrValue) -> Option<Ordering> {
    match (left, right) {
        (AttrValue::String(a), AttrValue::String(b)) => Some(a.cmp(b)),
        (AttrValue::Number(a), AttrValue::Number(b)) => a.partial_cmp(b),
        (AttrValue::Bool(a), AttrValue::Bool(b)) => Some(a.cmp(b)),
        (AttrValue::Timestamp(a), AttrValue::Timestamp(b)) => Some(a.cmp(b)),
        (AttrValue::Binary(a), AttrValue::Binary(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
