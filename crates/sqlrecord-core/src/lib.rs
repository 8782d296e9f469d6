//! Core types and traits for SQLRecord Rust.
//!
//! This crate provides the foundational pieces shared by the query layer and
//! the record layer:
//!
//! - [`Value`] dynamic SQL values and literal rendering
//! - [`Row`] result rows
//! - [`Connection`] the blocking execution-layer seam
//! - [`Inflector`] naming conventions
//! - [`Error`] the error taxonomy

pub mod connection;
pub mod error;
pub mod inflect;
pub mod row;
pub mod value;

pub use connection::Connection;
pub use error::{
    Error, QueryError, QueryErrorKind, RecordError, RecordErrorKind, Result, SchemaError,
    SchemaErrorKind, TypeError,
};
pub use inflect::{English, Inflector};
pub use row::{FromValue, Row, from_named_value};
pub use value::Value;
