//! The execution layer seam.
//!
//! SQLRecord generates complete SQL text (values are rendered as escaped
//! literals) and hands it to a [`Connection`]. Drivers, pooling and
//! transactions live behind this trait; every call blocks until the driver
//! returns. Driver failures are returned as-is and propagate through the
//! record layer without translation.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// A database connection capable of executing generated statements.
///
/// # Example
///
/// ```rust,ignore
/// let rows = conn.query("SELECT * FROM posts WHERE posts.id = 1")?;
/// let id = conn.insert("INSERT INTO posts (title) VALUES ('Hello')")?;
/// let affected = conn.execute("DELETE FROM posts WHERE id = 1 LIMIT 1")?;
/// ```
pub trait Connection {
    /// Execute a query and return all rows.
    fn query(&self, sql: &str) -> Result<Vec<Row>>;

    /// Execute a statement (UPDATE, DELETE) and return rows affected.
    fn execute(&self, sql: &str) -> Result<u64>;

    /// Execute an INSERT and return the generated identity.
    fn insert(&self, sql: &str) -> Result<Value>;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn query(&self, sql: &str) -> Result<Vec<Row>> {
        (**self).query(sql)
    }

    fn execute(&self, sql: &str) -> Result<u64> {
        (**self).execute(sql)
    }

    fn insert(&self, sql: &str) -> Result<Value> {
        (**self).insert(sql)
    }
}
