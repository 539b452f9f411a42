//! Collection queries

use serde_json::Value;
use std::cmp::Ordering;

use super::data::{compare_values, field, Document};
use super::path::CollectionPath;

/// Comparison applied by a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    ArrayContains,
}

/// `field op value`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// Documents lacking the field never match
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = field(doc, &self.field) else {
            return false;
        };
        match self.op {
            FilterOp::ArrayContains => actual
                .as_array()
                .map(|items| items.contains(&self.value))
                .unwrap_or(false),
            FilterOp::Eq => values_equal(actual, &self.value),
            FilterOp::Ne => !values_equal(actual, &self.value),
            op => match compare_values(actual, &self.value) {
                Some(ordering) => match op {
                    FilterOp::Lt => ordering == Ordering::Less,
                    FilterOp::Lte => ordering != Ordering::Greater,
                    FilterOp::Gt => ordering == Ordering::Greater,
                    FilterOp::Gte => ordering != Ordering::Less,
                    _ => false,
                },
                None => false,
            },
        }
    }
}

/// Numeric equality ignores the integer/float distinction
fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Some(Ordering::Equal) || a == b
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Query over one collection
///
/// Filters apply first, then ordering (documents missing the order field are
/// excluded), then the `start_after` cursor, then `offset` and `limit`.
#[derive(Debug, Clone)]
pub struct Query {
    pub collection: CollectionPath,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub start_after: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(collection: CollectionPath) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
            start_after: None,
            offset: 0,
            limit: None,
        }
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Resume after the document with this id; ignored when it does not exist
    pub fn start_after(mut self, id: Option<impl Into<String>>) -> Self {
        self.start_after = id.map(Into::into);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
            && self
                .order_by
                .as_ref()
                .map(|(f, _)| field(doc, f).is_some())
                .unwrap_or(true)
    }

    /// Total order used for sorting and cursor positioning: order field, then id
    pub fn compare(&self, a: (&str, &Document), b: (&str, &Document)) -> Ordering {
        let by_field = match &self.order_by {
            Some((f, direction)) => {
                let ordering = match (field(a.1, f), field(b.1, f)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            }
            None => Ordering::Equal,
        };
        by_field.then_with(|| a.0.cmp(b.0))
    }
}
