//! SQLRecord Rust - active-record style object mapping.
//!
//! Entity types are declared at runtime, records carry their attributes in
//! a dynamic map, and associations between records are resolved, eager
//! loaded and cascaded by the library:
//!
//! - Field and association dispatch through per-entity dispatch tables
//! - `belongs_to`, `has_one` and `has_many` associations with dependent policies
//! - One joined SELECT per find, split back into nested records
//! - Insert/update/delete with cascading saves and lifecycle hooks
//! - JSON dumps of records and their loaded associations
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlrecord::prelude::*;
//!
//! let schema = Schema::builder()
//!     .entity(
//!         EntityBuilder::new("Post")
//!             .columns(["id", "title"])
//!             .has_many("comments", AssociationOptions::new()),
//!     )
//!     .entity(EntityBuilder::new("Comment").columns(["id", "body", "post_id"]))
//!     .build()?;
//!
//! // Create
//! let mut post = schema.new_record("Post")?;
//! post.set("title", "Hello")?;
//! let comment = schema.model("Comment")?.build([("body", "First!")])?;
//! post.call("comments_push", vec![Arg::from(comment)])?;
//! post.save(&conn)?;
//!
//! // Find with eager loading
//! let posts = schema.model("Post")?;
//! let found = posts.find_all(&FindOptions::new().include("comments").order("id"), &conn)?;
//! for post in &found {
//!     println!("{} has {} comments", post.value("title")?.as_str().unwrap_or(""),
//!         post.get("comments")?.records().len());
//! }
//!
//! // Destroy (comments are nullified by default)
//! let mut post = posts.find_by_id(1, &conn)?;
//! post.destroy(&conn)?;
//! ```
//!
//! SQL runs through the blocking [`Connection`] trait from `sqlrecord-core`;
//! no driver is bundled.

pub mod association;
pub mod dump;
pub mod finder;
pub mod hooks;
pub mod model;
pub mod persistence;
pub mod record;
pub mod schema;

pub use association::{Association, Collection, Single};
pub use dump::DumpOptions;
pub use finder::Found;
pub use hooks::{Hook, LifecycleEvent};
pub use model::Model;
pub use record::{Arg, Assign, Field, FieldKind, Record};
pub use schema::{
    Accessor, AssociationDef, AssociationKind, AssociationOptions, Dependent, EntityBuilder,
    EntityId, EntityType, Schema, SchemaBuilder,
};

pub use sqlrecord_core::{
    Connection, English, Error, Inflector, RecordError, RecordErrorKind, Result, Row, Value,
};
pub use sqlrecord_query::{
    Conditions, FindOptions, FindQuery, FindSource, Identifier, generate_find_query,
    transform_row,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sqlrecord::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Arg, Assign, AssociationOptions, Conditions, Connection, Dependent, DumpOptions,
        EntityBuilder, Error, Field, FindOptions, Found, Identifier, LifecycleEvent, Model, Record,
        RecordErrorKind, Result, Schema, Value,
    };
}
