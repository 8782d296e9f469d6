//! Records and attribute/association dispatch.
//!
//! A [`Record`] is one row of one entity type plus the association state
//! hanging off it. Field access goes through the entity's dispatch table:
//!
//! | read `get(name)`                       | write `set(name, v)`              |
//! |----------------------------------------|-----------------------------------|
//! | stored attribute → its value           | frozen → `ObjectFrozen`           |
//! | association → related record(s)        | column → store, mark modified     |
//! | declared but unset column → NULL       | association → association `set`   |
//! | `<singular>_ids` (has-many) → ids      | `<singular>_ids` → `set_ids`      |
//! | otherwise `AttributeNotFound`          | otherwise `AttributeNotFound`     |
//!
//! Method-style calls such as `comments_push` are routed by [`Record::call`]
//! to the association whose name is the longest `<name>_` prefix.

use crate::association::Association;
use crate::model::Model;
use crate::schema::{Accessor, AssociationDef, EntityId, EntityType, Schema};
use sqlrecord_core::{
    Connection, Error, FromValue, Result, TypeError, Value, from_named_value,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// What a field read resolves to.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Value,
    One,
    Many,
    Ids,
}

/// The result of [`Record::get`].
#[derive(Debug, Clone)]
pub enum Field<'a> {
    /// A column or other stored attribute.
    Value(Value),
    /// A belongs-to or has-one target, if any.
    One(Option<&'a Record>),
    /// The dependents of a has-many association.
    Many(&'a [Record]),
    /// The `<singular>_ids` of a has-many association.
    Ids(Vec<Value>),
}

impl<'a> Field<'a> {
    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Value(_) => FieldKind::Value,
            Field::One(_) => FieldKind::One,
            Field::Many(_) => FieldKind::Many,
            Field::Ids(_) => FieldKind::Ids,
        }
    }

    /// The scalar value; id lists come back as [`Value::Array`].
    pub fn into_value(self) -> Option<Value> {
        match self {
            Field::Value(v) => Some(v),
            Field::Ids(ids) => Some(Value::Array(ids)),
            Field::One(_) | Field::Many(_) => None,
        }
    }

    /// The single related record.
    pub fn record(&self) -> Option<&'a Record> {
        match self {
            Field::One(target) => *target,
            _ => None,
        }
    }

    /// Related records as a slice; a single target is a one-element slice.
    pub fn records(&self) -> &'a [Record] {
        match self {
            Field::Many(items) => *items,
            Field::One(Some(target)) => std::slice::from_ref(*target),
            _ => &[],
        }
    }
}

/// A value written through [`Record::set`].
#[derive(Debug, Clone)]
pub enum Assign {
    Value(Value),
    Record(Record),
    Records(Vec<Record>),
}

impl Assign {
    fn describe(&self) -> &'static str {
        match self {
            Assign::Value(v) => v.type_name(),
            Assign::Record(_) => "record",
            Assign::Records(_) => "records",
        }
    }
}

impl From<Record> for Assign {
    fn from(record: Record) -> Self {
        Assign::Record(record)
    }
}

impl From<Vec<Record>> for Assign {
    fn from(records: Vec<Record>) -> Self {
        Assign::Records(records)
    }
}

macro_rules! assign_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Assign {
                fn from(v: $ty) -> Self {
                    Assign::Value(Value::from(v))
                }
            }
        )*
    };
}

assign_from_value!(Value, bool, i32, i64, f64, String, &str, Vec<i64>, Vec<Value>);

/// An argument to a method-style association call.
#[derive(Debug, Clone)]
pub enum Arg {
    Record(Record),
    Value(Value),
    /// Attributes for a record built on the fly.
    Attributes(Vec<(String, Value)>),
}

impl From<Record> for Arg {
    fn from(record: Record) -> Self {
        Arg::Record(record)
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Value(Value::BigInt(value))
    }
}

pub(crate) fn assign_mismatch(name: &str, expected: &'static str, actual: &Assign) -> Error {
    Error::Type(TypeError {
        expected,
        actual: actual.describe().to_string(),
        column: Some(name.to_string()),
        rust_type: None,
    })
}

/// One instance of an entity type.
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    entity: EntityId,
    attributes: BTreeMap<String, Value>,
    associations: Vec<Association>,
    new_record: bool,
    modified: bool,
    frozen: bool,
}

impl Record {
    pub(crate) fn instantiate(schema: Arc<Schema>, entity: EntityId) -> Self {
        let associations = schema
            .entity(entity)
            .associations()
            .iter()
            .map(|def| Association::for_kind(def.kind))
            .collect();
        Self {
            schema,
            entity,
            attributes: BTreeMap::new(),
            associations,
            new_record: true,
            modified: false,
            frozen: false,
        }
    }

    /// A fresh, unsaved record of the named entity type.
    pub fn new(schema: &Arc<Schema>, entity: &str) -> Result<Self> {
        schema.new_record(entity)
    }

    /// Build a record from name/value pairs.
    ///
    /// Every pair goes through [`set`](Self::set), so associations and
    /// `_ids` accessors can be given too. The flags are then forced to the
    /// given values.
    pub fn with_attributes<I, K, V>(
        schema: &Arc<Schema>,
        entity: &str,
        pairs: I,
        new_record: bool,
        is_modified: bool,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Assign>,
    {
        let mut record = schema.new_record(entity)?;
        for (name, value) in pairs {
            record.set(name.as_ref(), value)?;
        }
        record.new_record = new_record;
        record.modified = is_modified;
        Ok(record)
    }

    /// Rebuild a persisted record from one table's share of a result row.
    ///
    /// Names that collide with an association are dropped so a name is
    /// never both an attribute and an association.
    pub(crate) fn from_fragment<I>(schema: Arc<Schema>, entity: EntityId, attributes: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut record = Self::instantiate(schema, entity);
        for (name, value) in attributes {
            if matches!(
                record.entity().accessor(&name),
                Some(Accessor::Association(_))
            ) {
                tracing::trace!(column = %name, "Skipping column named like an association");
                continue;
            }
            record.attributes.insert(name, value);
        }
        record.new_record = false;
        record
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn entity(&self) -> &EntityType {
        self.schema.entity(self.entity)
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity
    }

    /// A model handle for this record's entity type.
    pub fn model(&self) -> Model {
        Model::new(Arc::clone(&self.schema), self.entity)
    }

    pub fn columns(&self) -> &[String] {
        self.entity().columns()
    }

    pub fn primary_key(&self) -> &str {
        self.entity().primary_key()
    }

    pub fn table_name(&self) -> &str {
        self.entity().table_name()
    }

    /// The primary key value, NULL until assigned or inserted.
    pub fn id(&self) -> Value {
        self.raw_attribute(self.primary_key()).clone()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_new_record(&self) -> bool {
        self.new_record
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// Stored attributes. Declared columns that were never set are absent.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// The association instance with this name.
    pub fn association(&self, name: &str) -> Option<&Association> {
        let (index, _) = self.entity().association(name)?;
        self.associations.get(index)
    }

    pub(crate) fn association_mut(&mut self, index: usize) -> &mut Association {
        &mut self.associations[index]
    }

    pub(crate) fn association_count(&self) -> usize {
        self.associations.len()
    }

    pub(crate) fn raw_attribute(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.attributes.get(name).unwrap_or(&NULL)
    }

    /// Store a value that already matches the database.
    pub(crate) fn store_clean(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    pub(crate) fn mark_saved(&mut self) {
        self.new_record = false;
        self.modified = false;
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Run `f` on one association with this record as its owner.
    ///
    /// The association list is detached for the duration of the call so
    /// the association and its owner can both be borrowed mutably.
    pub(crate) fn with_association<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut Association, &AssociationDef, &mut Record) -> R,
    ) -> R {
        let schema = Arc::clone(&self.schema);
        let def = &schema.entity(self.entity).associations()[index];
        let mut associations = std::mem::take(&mut self.associations);
        let result = f(&mut associations[index], def, self);
        self.associations = associations;
        result
    }

    /// Read a field.
    pub fn get(&self, name: &str) -> Result<Field<'_>> {
        if let Some(value) = self.attributes.get(name) {
            return Ok(Field::Value(value.clone()));
        }
        match self.entity().accessor(name) {
            Some(Accessor::Association(i)) => Ok(self.associations[i].get()),
            Some(Accessor::Column(_)) => Ok(Field::Value(Value::Null)),
            Some(Accessor::AssociationIds(i)) => Ok(Field::Ids(self.associations[i].get_ids())),
            None => Err(Error::attribute_not_found(name)),
        }
    }

    /// Read a scalar field; association names are a type error.
    pub fn value(&self, name: &str) -> Result<Value> {
        let field = self.get(name)?;
        let kind = field.kind();
        field.into_value().ok_or_else(|| {
            Error::Type(TypeError {
                expected: "value",
                actual: format!("{kind:?}").to_lowercase(),
                column: Some(name.to_string()),
                rust_type: None,
            })
        })
    }

    /// Read a scalar field converted to `T`.
    ///
    /// ```
    /// use sqlrecord::{EntityBuilder, Schema};
    ///
    /// let schema = Schema::builder()
    ///     .entity(EntityBuilder::new("Post").columns(["id", "title"]))
    ///     .build()
    ///     .unwrap();
    /// let mut post = schema.new_record("Post").unwrap();
    /// post.set("title", "Hello").unwrap();
    /// assert_eq!(post.get_as::<String>("title").unwrap(), "Hello");
    /// assert_eq!(post.get_as::<Option<i64>>("id").unwrap(), None);
    /// ```
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.value(name)?;
        from_named_value(name, &value)
    }

    /// Write a field.
    pub fn set(&mut self, name: &str, value: impl Into<Assign>) -> Result<()> {
        if self.frozen {
            return Err(Error::object_frozen(name));
        }
        let value = value.into();
        match self.entity().accessor(name) {
            Some(Accessor::Column(_)) => match value {
                Assign::Value(v) => {
                    self.attributes.insert(name.to_string(), v);
                    self.modified = true;
                    Ok(())
                }
                other => Err(assign_mismatch(name, "value", &other)),
            },
            Some(Accessor::Association(i)) => {
                self.with_association(i, |association, def, owner| {
                    association.set(def, value, owner)
                })
            }
            Some(Accessor::AssociationIds(i)) => {
                let ids = match value {
                    Assign::Value(Value::Array(ids)) => ids,
                    Assign::Value(Value::Null) => Vec::new(),
                    Assign::Value(id) => vec![id],
                    other => return Err(assign_mismatch(name, "id list", &other)),
                };
                self.with_association(i, |association, def, _| association.set_ids(def, ids))
            }
            None => Err(Error::attribute_not_found(name)),
        }
    }

    /// Invoke a method-style association operation, e.g. `comments_push`.
    ///
    /// The association whose name is the longest prefix of `method`
    /// (followed by `_`) receives the remainder as the operation name.
    /// Mutating operations return NULL; `size` and `ids` return their
    /// result.
    pub fn call(&mut self, method: &str, args: Vec<Arg>) -> Result<Value> {
        let matched = self
            .entity()
            .associations()
            .iter()
            .enumerate()
            .filter(|(_, def)| {
                method
                    .strip_prefix(def.name.as_str())
                    .is_some_and(|rest| rest.len() > 1 && rest.starts_with('_'))
            })
            .max_by_key(|(_, def)| def.name.len())
            .map(|(i, def)| (i, method[def.name.len() + 1..].to_string()));

        let Some((index, operation)) = matched else {
            return Err(Error::method_not_found(method));
        };
        tracing::trace!(method, operation = %operation, "Dispatching association call");
        self.with_association(index, |association, def, owner| {
            association.invoke(def, &operation, method, args, owner)
        })
    }

    /// Query an association that was not eager-loaded, replacing its
    /// current state.
    pub fn load<C: Connection + ?Sized>(&mut self, name: &str, conn: &C) -> Result<()> {
        let (index, _) = self
            .entity()
            .association(name)
            .ok_or_else(|| Error::attribute_not_found(name))?;
        self.with_association(index, |association, def, owner| {
            association.load(def, owner, conn)
        })
    }

    /// Read an association, loading it first if needed.
    pub fn fetch<C: Connection + ?Sized>(&mut self, name: &str, conn: &C) -> Result<Field<'_>> {
        let loaded = self
            .association(name)
            .ok_or_else(|| Error::attribute_not_found(name))?
            .is_loaded();
        if !loaded {
            self.load(name, conn)?;
        }
        self.get(name)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("entity", &self.entity().name())
            .field("attributes", &self.attributes)
            .field("associations", &self.associations)
            .field("new_record", &self.new_record)
            .field("modified", &self.modified)
            .field("frozen", &self.frozen)
            .finish()
    }
}
