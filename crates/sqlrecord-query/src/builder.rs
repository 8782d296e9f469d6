//! Statement builders for INSERT, UPDATE and DELETE.
//!
//! Values are rendered inline as SQL literals, so each builder produces
//! complete statement text ready for [`Connection`].

use sqlrecord_core::{Connection, Result, Value};

/// Comparison used by a builder filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    In,
    NotIn,
}

/// One `column <op> value` predicate.
#[derive(Debug, Clone, PartialEq)]
struct Filter {
    column: String,
    op: Op,
    value: Value,
}

impl Filter {
    fn to_sql(&self) -> String {
        let column = &self.column;
        match (self.op, &self.value) {
            (Op::Eq, Value::Null) => format!("{column} IS NULL"),
            (Op::Ne, Value::Null) => format!("{column} IS NOT NULL"),
            (Op::Eq, v) => format!("{column} = {}", v.to_sql_literal()),
            (Op::Ne, v) => format!("{column} <> {}", v.to_sql_literal()),
            (Op::In, Value::Array(items)) if items.is_empty() => format!("{column} IN (NULL)"),
            // NOT IN of nothing excludes nothing.
            (Op::NotIn, Value::Array(items)) if items.is_empty() => "1 = 1".to_string(),
            (Op::In, v) => format!("{column} IN ({})", v.to_sql_literal()),
            (Op::NotIn, v) => format!("{column} NOT IN ({})", v.to_sql_literal()),
        }
    }
}

fn render_filters(sql: &mut String, filters: &[Filter], limit: Option<u64>) {
    if !filters.is_empty() {
        let parts: Vec<String> = filters.iter().map(Filter::to_sql).collect();
        sql.push_str(" WHERE ");
        sql.push_str(&parts.join(" AND "));
    }
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
}

/// INSERT statement builder.
///
/// ```
/// use sqlrecord_query::InsertBuilder;
/// use sqlrecord_core::Value;
///
/// let sql = InsertBuilder::new("posts", ["title", "author_id"])
///     .values([Value::from("Hello"), Value::Null])
///     .build();
/// assert_eq!(sql, "INSERT INTO posts (title, author_id) VALUES ('Hello', NULL)");
/// ```
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    values: Vec<Value>,
}

impl InsertBuilder {
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            values: Vec::new(),
        }
    }

    /// Values in column order.
    pub fn values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.values = values.into_iter().collect();
        self
    }

    pub fn build(&self) -> String {
        let values: Vec<String> = self.values.iter().map(Value::to_sql_literal).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(", "),
            values.join(", ")
        )
    }

    /// Execute the INSERT and return the generated identity.
    pub fn execute<C: Connection + ?Sized>(&self, conn: &C) -> Result<Value> {
        let sql = self.build();
        tracing::trace!(sql = %sql, "Executing insert");
        conn.insert(&sql)
    }
}

/// UPDATE statement builder.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    assignments: Vec<(String, Value)>,
    filters: Vec<Filter>,
    limit: Option<u64>,
}

impl UpdateBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            filters: Vec::new(),
            limit: None,
        }
    }

    /// Assign one column.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    /// Assign several columns in order.
    pub fn set_all<I, K>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.assignments
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Add a WHERE predicate; predicates are AND-ed.
    pub fn filter(mut self, column: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// ```
    /// use sqlrecord_query::{Op, UpdateBuilder};
    ///
    /// let sql = UpdateBuilder::new("posts")
    ///     .set("title", "Hi")
    ///     .filter("id", Op::Eq, 3_i64)
    ///     .limit(1)
    ///     .build();
    /// assert_eq!(sql, "UPDATE posts SET title = 'Hi' WHERE id = 3 LIMIT 1");
    /// ```
    pub fn build(&self) -> String {
        let sets: Vec<String> = self
            .assignments
            .iter()
            .map(|(column, value)| format!("{column} = {}", value.to_sql_literal()))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.table, sets.join(", "));
        render_filters(&mut sql, &self.filters, self.limit);
        sql
    }

    /// Execute the UPDATE and return rows affected.
    pub fn execute<C: Connection + ?Sized>(&self, conn: &C) -> Result<u64> {
        let sql = self.build();
        tracing::trace!(sql = %sql, "Executing update");
        conn.execute(&sql)
    }
}

/// DELETE statement builder.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: String,
    filters: Vec<Filter>,
    limit: Option<u64>,
}

impl DeleteBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, column: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(&self) -> String {
        let mut sql = format!("DELETE FROM {}", self.table);
        render_filters(&mut sql, &self.filters, self.limit);
        sql
    }

    /// Execute the DELETE and return rows affected.
    pub fn execute<C: Connection + ?Sized>(&self, conn: &C) -> Result<u64> {
        let sql = self.build();
        tracing::trace!(sql = %sql, "Executing delete");
        conn.execute(&sql)
    }
}
