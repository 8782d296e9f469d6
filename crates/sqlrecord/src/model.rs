//! Entity-level handles.

use crate::association::join_spec;
use crate::record::{Assign, Record};
use crate::schema::{EntityId, EntityType, Schema};
use sqlrecord_core::Result;
use sqlrecord_query::{FindSource, JoinSpec};
use std::fmt;
use std::sync::Arc;

/// One entity type of a schema, used to create and find its records.
///
/// ```
/// use sqlrecord::{EntityBuilder, Schema};
///
/// let schema = Schema::builder()
///     .entity(EntityBuilder::new("Post").columns(["id", "title"]))
///     .build()
///     .unwrap();
/// let posts = schema.model("Post").unwrap();
/// assert_eq!(posts.entity().table_name(), "posts");
/// let post = posts.new_record();
/// assert!(post.is_new_record());
/// ```
#[derive(Clone)]
pub struct Model {
    schema: Arc<Schema>,
    id: EntityId,
}

impl Model {
    pub(crate) fn new(schema: Arc<Schema>, id: EntityId) -> Self {
        Self { schema, id }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity(&self) -> &EntityType {
        self.schema.entity(self.id)
    }

    pub fn new_record(&self) -> Record {
        Record::instantiate(Arc::clone(&self.schema), self.id)
    }

    /// A new record with the given attributes, unsaved and modified.
    pub fn build<I, K, V>(&self, pairs: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Assign>,
    {
        let mut record = self.new_record();
        for (name, value) in pairs {
            record.set(name.as_ref(), value)?;
        }
        Ok(record)
    }
}

impl FindSource for Model {
    fn table_name(&self) -> &str {
        self.entity().table_name()
    }

    fn primary_key(&self) -> &str {
        self.entity().primary_key()
    }

    fn columns(&self) -> &[String] {
        self.entity().columns()
    }

    fn join(&self, association: &str) -> Option<JoinSpec> {
        let entity = self.entity();
        let (_, def) = entity.association(association)?;
        Some(join_spec(&self.schema, entity, def))
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("entity", &self.entity().name())
            .finish()
    }
}
