//! Find-query synthesis and statement builders for SQLRecord Rust.
//!
//! `sqlrecord-query` is the **SQL generation layer**. It knows nothing about
//! records; entities describe themselves through [`FindSource`] and the
//! crate turns a find request into SELECT text plus the alias map needed to
//! split joined rows back apart.
//!
//! # Role In The Architecture
//!
//! - **Conditions**: [`Conditions`] renders raw, positional, named and
//!   column-pair filters into WHERE fragments.
//! - **Find synthesis**: [`generate_find_query`] assembles the SELECT, with
//!   `t<i>_r<j>` aliasing when associations are eager-loaded.
//! - **Write statements**: [`InsertBuilder`], [`UpdateBuilder`] and
//!   [`DeleteBuilder`] render and execute mutations.
//!
//! Everything executes through the `Connection` trait from `sqlrecord-core`.
//! Most users reach these types through the `sqlrecord` facade crate.

pub mod builder;
pub mod conditions;
pub mod find;
pub mod options;

pub use builder::{DeleteBuilder, InsertBuilder, Op, UpdateBuilder};
pub use conditions::Conditions;
pub use find::{
    ColumnRef, FindQuery, FindSource, ForeignKeySide, JoinSpec, TableFragment, build_join_clause,
    generate_find_query, transform_row,
};
pub use options::{FindOptions, Identifier};
