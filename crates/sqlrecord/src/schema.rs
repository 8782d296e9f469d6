//! Entity declarations.
//!
//! A [`Schema`] is built once from [`EntityBuilder`]s and then shared behind
//! an `Arc` by every record it creates. Building resolves association
//! targets, fills in conventional names through the [`Inflector`] and
//! precomputes each entity's dispatch table.

use crate::hooks::{Hook, Hooks, LifecycleEvent};
use crate::record::Record;
use sqlrecord_core::{English, Error, Inflector, Result, SchemaErrorKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Handle to an entity type inside its [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub(crate) usize);

/// The three association variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// This record holds the foreign key.
    BelongsTo,
    /// One dependent holds a key back to this record.
    HasOne,
    /// Any number of dependents hold a key back to this record.
    HasMany,
}

/// What happens to dependents when their owner is destroyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dependent {
    /// Set the dependents' foreign key to NULL.
    #[default]
    Nullify,
    /// Destroy each dependent (running its own cascade and hooks).
    Destroy,
    /// Leave dependents untouched.
    Keep,
}

/// Per-association overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationOptions {
    pub foreign_key: Option<String>,
    pub class_name: Option<String>,
    pub dependent: Dependent,
}

impl AssociationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn dependent(mut self, dependent: Dependent) -> Self {
        self.dependent = dependent;
        self
    }
}

/// A resolved association declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDef {
    pub name: String,
    pub kind: AssociationKind,
    pub target: EntityId,
    pub foreign_key: String,
    pub dependent: Dependent,
}

/// How a field name resolves on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    /// Index into the entity's columns.
    Column(usize),
    /// Index into the entity's associations.
    Association(usize),
    /// `<singular>_ids` on the has-many association at this index.
    AssociationIds(usize),
}

/// A fully resolved entity type.
pub struct EntityType {
    name: String,
    table: String,
    primary_key: String,
    columns: Vec<String>,
    associations: Vec<AssociationDef>,
    dispatch: HashMap<String, Accessor>,
    hooks: Hooks,
    inflector: Arc<dyn Inflector>,
}

impl EntityType {
    /// The type name, e.g. `Post`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn associations(&self) -> &[AssociationDef] {
        &self.associations
    }

    /// Find an association by name.
    pub fn association(&self, name: &str) -> Option<(usize, &AssociationDef)> {
        self.associations
            .iter()
            .enumerate()
            .find(|(_, def)| def.name == name)
    }

    /// Resolve a field name through the dispatch table.
    ///
    /// Declared columns and associations come first. Otherwise `<x>_ids`
    /// names the has-many association whose name is the plural of `x`.
    pub fn accessor(&self, name: &str) -> Option<Accessor> {
        if let Some(accessor) = self.dispatch.get(name) {
            return Some(*accessor);
        }
        let singular = name.strip_suffix("_ids").filter(|s| !s.is_empty())?;
        let plural = self.inflector.pluralize(singular);
        self.associations
            .iter()
            .position(|def| def.kind == AssociationKind::HasMany && def.name == plural)
            .map(Accessor::AssociationIds)
    }

    pub fn is_column(&self, name: &str) -> bool {
        matches!(self.accessor(name), Some(Accessor::Column(_)))
    }

    pub(crate) fn hook(&self, event: LifecycleEvent) -> Option<Hook> {
        self.hooks.get(event)
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("columns", &self.columns)
            .field("associations", &self.associations)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// All entity types known to the application.
pub struct Schema {
    entities: Vec<EntityType>,
    by_name: HashMap<String, EntityId>,
    inflector: Arc<dyn Inflector>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn entity(&self, id: EntityId) -> &EntityType {
        &self.entities[id.0]
    }

    /// Look an entity type up by type name.
    pub fn lookup(&self, name: &str) -> Result<EntityId> {
        self.by_name.get(name).copied().ok_or_else(|| {
            Error::schema(
                SchemaErrorKind::UnknownEntity,
                format!("no entity named '{name}'"),
            )
        })
    }

    /// The entity whose backing table is `table`.
    pub fn entity_for_table(&self, table: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .position(|e| e.table == table)
            .map(EntityId)
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &EntityType)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i), e))
    }

    pub fn inflector(&self) -> &dyn Inflector {
        self.inflector.as_ref()
    }

    /// A model handle for finding and creating records of one entity type.
    pub fn model(self: &Arc<Self>, name: &str) -> Result<crate::Model> {
        let id = self.lookup(name)?;
        Ok(crate::Model::new(Arc::clone(self), id))
    }

    /// A fresh, unsaved record of the named entity type.
    pub fn new_record(self: &Arc<Self>, name: &str) -> Result<Record> {
        let id = self.lookup(name)?;
        Ok(Record::instantiate(Arc::clone(self), id))
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct PendingAssociation {
    name: String,
    kind: AssociationKind,
    options: AssociationOptions,
}

/// Declaration of one entity type.
///
/// ```
/// use sqlrecord::{AssociationOptions, Dependent, EntityBuilder};
///
/// let post = EntityBuilder::new("Post")
///     .columns(["id", "title", "author_id"])
///     .belongs_to("author", AssociationOptions::new().class_name("User"))
///     .has_many("comments", AssociationOptions::new().dependent(Dependent::Destroy));
/// ```
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    name: String,
    table: Option<String>,
    primary_key: String,
    columns: Vec<String>,
    associations: Vec<PendingAssociation>,
    hooks: Hooks,
}

impl EntityBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            primary_key: "id".to_string(),
            columns: Vec::new(),
            associations: Vec::new(),
            hooks: Hooks::default(),
        }
    }

    /// Override the conventional (tableized) table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn belongs_to(self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.association(name, AssociationKind::BelongsTo, options)
    }

    pub fn has_one(self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.association(name, AssociationKind::HasOne, options)
    }

    pub fn has_many(self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.association(name, AssociationKind::HasMany, options)
    }

    fn association(
        mut self,
        name: impl Into<String>,
        kind: AssociationKind,
        options: AssociationOptions,
    ) -> Self {
        self.associations.push(PendingAssociation {
            name: name.into(),
            kind,
            options,
        });
        self
    }

    /// Register a lifecycle callback.
    pub fn hook<F>(mut self, event: LifecycleEvent, hook: F) -> Self
    where
        F: Fn(&mut Record) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.insert(event, Arc::new(hook));
        self
    }
}

/// Collects entity declarations and resolves them into a [`Schema`].
pub struct SchemaBuilder {
    entities: Vec<EntityBuilder>,
    inflector: Arc<dyn Inflector>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            inflector: Arc::new(English),
        }
    }

    /// Replace the default English inflection rules.
    pub fn inflector(mut self, inflector: impl Inflector + 'static) -> Self {
        self.inflector = Arc::new(inflector);
        self
    }

    pub fn entity(mut self, entity: EntityBuilder) -> Self {
        self.entities.push(entity);
        self
    }

    /// Validate every declaration and build the shared schema.
    #[tracing::instrument(level = "debug", skip(self), fields(entities = self.entities.len()))]
    pub fn build(self) -> Result<Arc<Schema>> {
        let inflector = self.inflector;

        let mut by_name = HashMap::new();
        for (i, entity) in self.entities.iter().enumerate() {
            if by_name.insert(entity.name.clone(), EntityId(i)).is_some() {
                return Err(Error::schema(
                    SchemaErrorKind::DuplicateEntity,
                    format!("entity '{}' is declared twice", entity.name),
                ));
            }
        }

        let tables: Vec<String> = self
            .entities
            .iter()
            .map(|e| {
                e.table
                    .clone()
                    .unwrap_or_else(|| inflector.tableize(&e.name))
            })
            .collect();

        let mut entities = Vec::with_capacity(self.entities.len());
        for (i, builder) in self.entities.iter().enumerate() {
            entities.push(resolve_entity(
                builder,
                tables[i].clone(),
                &self.entities,
                &by_name,
                &inflector,
            )?);
        }

        tracing::debug!(count = entities.len(), "Schema built");
        Ok(Arc::new(Schema {
            entities,
            by_name,
            inflector,
        }))
    }
}

fn resolve_entity(
    builder: &EntityBuilder,
    table: String,
    all: &[EntityBuilder],
    by_name: &HashMap<String, EntityId>,
    inflector: &Arc<dyn Inflector>,
) -> Result<EntityType> {
    let entity = &builder.name;
    let mut dispatch = HashMap::new();

    for (i, column) in builder.columns.iter().enumerate() {
        if dispatch.insert(column.clone(), Accessor::Column(i)).is_some() {
            return Err(Error::schema(
                SchemaErrorKind::DuplicateField,
                format!("column '{column}' is declared twice on {entity}"),
            ));
        }
    }
    if !builder.columns.contains(&builder.primary_key) {
        return Err(Error::schema(
            SchemaErrorKind::Invalid,
            format!(
                "primary key '{}' is not a column of {entity}",
                builder.primary_key
            ),
        ));
    }

    let owner_key = format!("{}_id", sqlrecord_core::inflect::to_snake_case(entity));
    let mut associations = Vec::with_capacity(builder.associations.len());

    for (i, pending) in builder.associations.iter().enumerate() {
        let name = &pending.name;
        if dispatch.insert(name.clone(), Accessor::Association(i)).is_some() {
            return Err(Error::schema(
                SchemaErrorKind::DuplicateField,
                format!("association '{name}' collides with another field of {entity}"),
            ));
        }

        let class_name = pending
            .options
            .class_name
            .clone()
            .unwrap_or_else(|| inflector.classify(name));
        let target = *by_name.get(&class_name).ok_or_else(|| {
            Error::schema(
                SchemaErrorKind::UnknownTarget,
                format!("association '{name}' on {entity} targets unknown entity '{class_name}'"),
            )
        })?;
        let target_builder = &all[target.0];

        let (foreign_key, key_holder) = match pending.kind {
            AssociationKind::BelongsTo => (
                pending
                    .options
                    .foreign_key
                    .clone()
                    .unwrap_or_else(|| format!("{name}_id")),
                builder,
            ),
            AssociationKind::HasOne | AssociationKind::HasMany => (
                pending
                    .options
                    .foreign_key
                    .clone()
                    .unwrap_or_else(|| owner_key.clone()),
                target_builder,
            ),
        };
        if !key_holder.columns.contains(&foreign_key) {
            return Err(Error::schema(
                SchemaErrorKind::Invalid,
                format!(
                    "foreign key '{foreign_key}' of association '{name}' is not a column of {}",
                    key_holder.name
                ),
            ));
        }

        associations.push(AssociationDef {
            name: name.clone(),
            kind: pending.kind,
            target,
            foreign_key,
            dependent: pending.options.dependent,
        });
    }

    Ok(EntityType {
        name: entity.clone(),
        table,
        primary_key: builder.primary_key.clone(),
        columns: builder.columns.clone(),
        associations,
        dispatch,
        hooks: builder.hooks.clone(),
        inflector: Arc::clone(inflector),
    })
}
