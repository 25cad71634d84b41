//! Query builder for entity set reads.
//!
//! Only the shapes the tap needs are modelled: an optional lower bound on
//! one timestamp field, an optional ascending order, and a column
//! projection.

use std::fmt;

use chrono::{DateTime, Utc};

use dynamics_core::format_datetime;

/// Sort direction for `$orderby`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "asc"),
        }
    }
}

/// `<field> ge <instant>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A read against one entity set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub entity_set: String,
    pub select: Vec<String>,
    pub filter: Option<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new(entity_set: impl Into<String>) -> Self {
        Self {
            entity_set: entity_set.into(),
            select: Vec::new(),
            filter: None,
            order_by: None,
        }
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Keep rows whose `field` is at or after `since`.
    pub fn filter_ge(mut self, field: impl Into<String>, since: DateTime<Utc>) -> Self {
        self.filter = Some(Filter {
            field: field.into(),
            since,
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// OData system query options, unencoded, in a stable order.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.select.is_empty() {
            params.push(("$select", self.select.join(",")));
        }
        if let Some(filter) = &self.filter {
            params.push((
                "$filter",
                format!("{} ge {}", filter.field, format_datetime(filter.since)),
            ));
        }
        if let Some(order) = &self.order_by {
            params.push(("$orderby", format!("{} {}", order.field, order.direction)));
        }
        params
    }
}
