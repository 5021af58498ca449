//! Table queries: "select rows from table T matching F ordered by O".
//!
//! A [`TableQuery`] renders to the backend's query-string dialect
//! (`column=op.value`, `order=column.desc`) and to a canonical cache key that
//! does not depend on the order filters were added in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Equal.
    Eq,
    /// Not equal.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Member of a comma-separated list.
    In,
}

impl FilterOp {
    /// The operator's name in the query string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
        }
    }
}

/// A single column filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Filter {
    /// Column name.
    pub column: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Operand. For [`FilterOp::In`], the values joined by commas.
    pub value: String,
}

impl Filter {
    /// Render the right-hand side of `column=...`.
    #[must_use]
    pub fn operand(&self) -> String {
        match self.op {
            FilterOp::In => format!("in.({})", self.value),
            op => format!("{}.{}", op.as_str(), self.value),
        }
    }
}

/// Sort direction of an order clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

/// One order clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    /// Column name.
    pub column: String,
    /// Sort direction.
    pub direction: Direction,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        write!(f, "{}.{dir}", self.column)
    }
}

/// A select against one table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableQuery {
    /// Table name.
    pub table: String,
    /// Column list (`*` for all).
    pub select: String,
    /// Row filters, combined with AND.
    pub filters: Vec<Filter>,
    /// Order clauses, most significant first.
    pub order: Vec<Order>,
    /// Maximum number of rows.
    pub limit: Option<u32>,
}

impl TableQuery {
    /// Select every column of `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Restrict the selected columns.
    #[must_use]
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, column: impl Into<String>, op: FilterOp, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
            value: value.to_string(),
        });
        self
    }

    /// Add an equality filter.
    #[must_use]
    pub fn eq(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    /// Add a lower bound (exclusive).
    #[must_use]
    pub fn gt(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Gt, value)
    }

    /// Add a lower bound (inclusive).
    #[must_use]
    pub fn gte(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Gte, value)
    }

    /// Add an upper bound (exclusive).
    #[must_use]
    pub fn lt(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Lt, value)
    }

    /// Add an upper bound (inclusive).
    #[must_use]
    pub fn lte(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Lte, value)
    }

    /// Add a membership filter.
    #[must_use]
    pub fn in_list<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let joined = values
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.filter(column, FilterOp::In, joined)
    }

    /// Sort ascending by `column`.
    #[must_use]
    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order.push(Order {
            column: column.into(),
            direction: Direction::Asc,
        });
        self
    }

    /// Sort descending by `column`.
    #[must_use]
    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order.push(Order {
            column: column.into(),
            direction: Direction::Desc,
        });
        self
    }

    /// Cap the number of rows.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs for the request, filters in canonical order.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut filters: Vec<&Filter> = self.filters.iter().collect();
        filters.sort();

        let mut params = Vec::with_capacity(filters.len() + 3);
        params.push(("select".to_string(), self.select.clone()));
        params.extend(filters.into_iter().map(|f| (f.column.clone(), f.operand())));
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Canonical identity of this query, used as a cache key.
    ///
    /// Two queries with the same filters added in a different order share a
    /// key.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let params = self
            .to_params()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{params}", self.table)
    }
}
