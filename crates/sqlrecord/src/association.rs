//! Association state and behavior.
//!
//! Every record carries one [`Association`] per declared association. The
//! owning record is never stored inside the association; operations that
//! need it receive it as an argument, together with the resolved
//! [`AssociationDef`].

use crate::model::Model;
use crate::record::{Arg, Assign, Field, Record, assign_mismatch};
use crate::schema::{AssociationDef, AssociationKind, Dependent, EntityType, Schema};
use sqlrecord_core::{Connection, Error, Result, TypeError, Value};
use sqlrecord_query::{
    Conditions, FindOptions, ForeignKeySide, JoinSpec, Op, UpdateBuilder, build_join_clause,
};
use std::sync::Arc;

/// State of a belongs-to or has-one association.
#[derive(Debug, Clone, Default)]
pub struct Single {
    target: Option<Box<Record>>,
    loaded: bool,
}

/// State of a has-many association.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    items: Vec<Record>,
    loaded: bool,
    /// Ids assigned through `<singular>_ids`, applied on the next save.
    pending_ids: Option<Vec<Value>>,
    /// Ids of dependents removed with `delete`, unlinked on the next save.
    removed: Vec<Value>,
    /// The whole collection was reassigned; unlisted rows are unlinked on save.
    replaced: bool,
}

/// One association instance on a record.
#[derive(Debug, Clone)]
pub enum Association {
    BelongsTo(Single),
    HasOne(Single),
    HasMany(Collection),
}

impl Association {
    pub(crate) fn for_kind(kind: AssociationKind) -> Self {
        match kind {
            AssociationKind::BelongsTo => Association::BelongsTo(Single::default()),
            AssociationKind::HasOne => Association::HasOne(Single::default()),
            AssociationKind::HasMany => Association::HasMany(Collection::default()),
        }
    }

    pub fn kind(&self) -> AssociationKind {
        match self {
            Association::BelongsTo(_) => AssociationKind::BelongsTo,
            Association::HasOne(_) => AssociationKind::HasOne,
            Association::HasMany(_) => AssociationKind::HasMany,
        }
    }

    /// Has this association been populated, eagerly or lazily?
    pub fn is_loaded(&self) -> bool {
        match self {
            Association::BelongsTo(s) | Association::HasOne(s) => s.loaded,
            Association::HasMany(c) => c.loaded,
        }
    }

    pub(crate) fn mark_loaded(&mut self) {
        match self {
            Association::BelongsTo(s) | Association::HasOne(s) => s.loaded = true,
            Association::HasMany(c) => c.loaded = true,
        }
    }

    /// Current related value(s).
    pub fn get(&self) -> Field<'_> {
        match self {
            Association::BelongsTo(s) | Association::HasOne(s) => Field::One(s.target.as_deref()),
            Association::HasMany(c) => Field::Many(&c.items),
        }
    }

    /// Primary keys of the dependents (has-many only; empty otherwise).
    ///
    /// Ids assigned but not yet saved take precedence over loaded items.
    pub fn get_ids(&self) -> Vec<Value> {
        match self {
            Association::HasMany(c) => match &c.pending_ids {
                Some(ids) => ids.clone(),
                None => c
                    .items
                    .iter()
                    .map(Record::id)
                    .filter(|id| !id.is_null())
                    .collect(),
            },
            _ => Vec::new(),
        }
    }

    pub(crate) fn set(
        &mut self,
        def: &AssociationDef,
        value: Assign,
        owner: &mut Record,
    ) -> Result<()> {
        match self {
            Association::BelongsTo(single) => match value {
                Assign::Record(target) => {
                    write_key(owner, &def.foreign_key, target.id())?;
                    single.target = Some(Box::new(target));
                    single.loaded = true;
                    Ok(())
                }
                Assign::Value(Value::Null) => {
                    write_key(owner, &def.foreign_key, Value::Null)?;
                    single.target = None;
                    single.loaded = true;
                    Ok(())
                }
                Assign::Value(key) => {
                    write_key(owner, &def.foreign_key, key)?;
                    single.target = None;
                    single.loaded = false;
                    Ok(())
                }
                other => Err(assign_mismatch(&def.name, "record", &other)),
            },
            Association::HasOne(single) => match value {
                Assign::Record(mut target) => {
                    link(&mut target, &def.foreign_key, &owner.id())?;
                    single.target = Some(Box::new(target));
                    single.loaded = true;
                    Ok(())
                }
                Assign::Value(Value::Null) => {
                    single.target = None;
                    single.loaded = true;
                    Ok(())
                }
                other => Err(assign_mismatch(&def.name, "record", &other)),
            },
            Association::HasMany(collection) => match value {
                Assign::Records(mut items) => {
                    let owner_id = owner.id();
                    for item in &mut items {
                        link(item, &def.foreign_key, &owner_id)?;
                    }
                    collection.items = items;
                    collection.loaded = true;
                    collection.pending_ids = None;
                    collection.replaced = true;
                    Ok(())
                }
                Assign::Value(Value::Array(ids)) => {
                    collection.set_ids(ids);
                    Ok(())
                }
                Assign::Value(Value::Null) => {
                    collection.clear();
                    Ok(())
                }
                other => Err(assign_mismatch(&def.name, "records", &other)),
            },
        }
    }

    /// Assign the dependents by id (has-many only).
    pub(crate) fn set_ids(&mut self, def: &AssociationDef, ids: Vec<Value>) -> Result<()> {
        match self {
            Association::HasMany(collection) => {
                collection.set_ids(ids);
                Ok(())
            }
            _ => Err(Error::attribute_not_found(&format!("{}_ids", def.name))),
        }
    }

    /// Does a save of the owner have to write anything for this association?
    pub fn needs_saving(&self, def: &AssociationDef, owner: &Record) -> bool {
        match self {
            Association::BelongsTo(single) => single
                .target
                .as_deref()
                .is_some_and(|t| t.is_new_record() || t.is_modified()),
            Association::HasOne(single) => single
                .target
                .as_deref()
                .is_some_and(|t| is_dirty_dependent(t, def, &owner.id())),
            Association::HasMany(collection) => {
                let owner_id = owner.id();
                collection.pending_ids.is_some()
                    || collection.replaced
                    || !collection.removed.is_empty()
                    || collection
                        .items
                        .iter()
                        .any(|item| is_dirty_dependent(item, def, &owner_id))
            }
        }
    }

    /// Persist whatever [`needs_saving`](Self::needs_saving) reported.
    ///
    /// Belongs-to saves the referenced record and copies its identity into
    /// the owner's foreign key, so it must run before the owner is written.
    /// Has-one and has-many point their dependents at the owner and save
    /// them, so they must run after.
    #[tracing::instrument(level = "trace", skip_all, fields(association = %def.name))]
    pub(crate) fn save_as_needed<C: Connection + ?Sized>(
        &mut self,
        def: &AssociationDef,
        owner: &mut Record,
        conn: &C,
    ) -> Result<()> {
        match self {
            Association::BelongsTo(single) => {
                if let Some(target) = single.target.as_deref_mut() {
                    target.save(conn)?;
                    write_key(owner, &def.foreign_key, target.id())?;
                }
                Ok(())
            }
            Association::HasOne(single) => {
                if let Some(target) = single.target.as_deref_mut() {
                    link(target, &def.foreign_key, &owner.id())?;
                    target.save(conn)?;
                }
                Ok(())
            }
            Association::HasMany(collection) => collection.save(def, owner, conn),
        }
    }

    /// Apply the dependent policy when the owner is destroyed.
    #[tracing::instrument(level = "trace", skip_all, fields(association = %def.name))]
    pub(crate) fn destroy<C: Connection + ?Sized>(
        &mut self,
        def: &AssociationDef,
        owner: &Record,
        conn: &C,
    ) -> Result<()> {
        if def.kind == AssociationKind::BelongsTo {
            return Ok(());
        }
        let owner_id = owner.id();
        if owner_id.is_null() {
            return Ok(());
        }
        let target = owner.schema().entity(def.target);

        match def.dependent {
            Dependent::Keep => Ok(()),
            Dependent::Nullify => {
                UpdateBuilder::new(target.table_name())
                    .set(def.foreign_key.as_str(), Value::Null)
                    .filter(def.foreign_key.as_str(), Op::Eq, owner_id.clone())
                    .execute(conn)?;
                for item in self.items_mut() {
                    if item.raw_attribute(&def.foreign_key).same_key(&owner_id) {
                        item.store_clean(&def.foreign_key, Value::Null);
                    }
                }
                Ok(())
            }
            Dependent::Destroy => {
                let model = Model::new(Arc::clone(owner.schema()), def.target);
                let mut dependents = model.find_all(&dependents_of(def, owner_id), conn)?;
                tracing::debug!(count = dependents.len(), "Destroying dependents");
                for dependent in &mut dependents {
                    dependent.destroy(conn)?;
                }
                match self {
                    Association::HasOne(single) => {
                        single.target = dependents.into_iter().next().map(Box::new);
                    }
                    Association::HasMany(collection) => collection.items = dependents,
                    Association::BelongsTo(_) => {}
                }
                Ok(())
            }
        }
    }

    /// Attach one record reconstructed from a joined row.
    pub(crate) fn populate_from_find(&mut self, record: Record) {
        match self {
            Association::BelongsTo(single) | Association::HasOne(single) => {
                if single.target.is_none() {
                    single.target = Some(Box::new(record));
                }
                single.loaded = true;
            }
            Association::HasMany(collection) => {
                let id = record.id();
                let seen = collection.items.iter().any(|item| {
                    if id.is_null() {
                        item.attributes() == record.attributes()
                    } else {
                        item.id().same_key(&id)
                    }
                });
                if !seen {
                    collection.items.push(record);
                }
                collection.loaded = true;
            }
        }
    }

    /// Query the related record(s) for an association that was not
    /// eager-loaded.
    #[tracing::instrument(level = "debug", skip_all, fields(association = %def.name))]
    pub(crate) fn load<C: Connection + ?Sized>(
        &mut self,
        def: &AssociationDef,
        owner: &Record,
        conn: &C,
    ) -> Result<()> {
        let model = Model::new(Arc::clone(owner.schema()), def.target);
        match self {
            Association::BelongsTo(single) => {
                let key = owner.raw_attribute(&def.foreign_key).clone();
                single.target = if key.is_null() {
                    None
                } else {
                    let options = FindOptions::new().conditions(Conditions::columns([(
                        model.entity().primary_key().to_string(),
                        key,
                    )]));
                    model.find_first(&options, conn)?.map(Box::new)
                };
                single.loaded = true;
            }
            Association::HasOne(single) => {
                let owner_id = owner.id();
                single.target = if owner_id.is_null() {
                    None
                } else {
                    model
                        .find_first(&dependents_of(def, owner_id), conn)?
                        .map(Box::new)
                };
                single.loaded = true;
            }
            Association::HasMany(collection) => {
                let owner_id = owner.id();
                collection.items = if owner_id.is_null() {
                    Vec::new()
                } else {
                    model.find_all(&dependents_of(def, owner_id), conn)?
                };
                collection.loaded = true;
            }
        }
        Ok(())
    }

    /// Run a method-style operation such as `push` from `comments_push`.
    ///
    /// `method` is the full method name, used in errors.
    pub(crate) fn invoke(
        &mut self,
        def: &AssociationDef,
        operation: &str,
        method: &str,
        args: Vec<Arg>,
        owner: &mut Record,
    ) -> Result<Value> {
        let mutating = matches!(operation, "push" | "delete" | "clear" | "build");
        if mutating && owner.is_frozen() {
            return Err(Error::object_frozen(&def.name));
        }

        match (self, operation) {
            (Association::HasMany(collection), "push" | "build") => {
                let owner_id = owner.id();
                for arg in args {
                    let mut item = arg_to_record(owner.schema(), def, arg)?;
                    link(&mut item, &def.foreign_key, &owner_id)?;
                    collection.items.push(item);
                }
                Ok(Value::Null)
            }
            (Association::HasMany(collection), "delete") => {
                for arg in args {
                    let id = match arg {
                        Arg::Record(record) => record.id(),
                        Arg::Value(id) => id,
                        Arg::Attributes(_) => {
                            return Err(Error::Type(TypeError {
                                expected: "record or id",
                                actual: "attributes".to_string(),
                                column: Some(def.name.clone()),
                                rust_type: None,
                            }));
                        }
                    };
                    collection.remove(&id);
                }
                Ok(Value::Null)
            }
            (Association::HasMany(collection), "clear") => {
                collection.clear();
                Ok(Value::Null)
            }
            (Association::HasMany(collection), "size") => {
                let size = match &collection.pending_ids {
                    Some(ids) => ids.len(),
                    None => collection.items.len(),
                };
                Ok(Value::BigInt(size as i64))
            }
            (association @ Association::HasMany(_), "ids") => {
                Ok(Value::Array(association.get_ids()))
            }
            (association @ (Association::BelongsTo(_) | Association::HasOne(_)), "build") => {
                let mut args = args.into_iter();
                let (Some(arg), None) = (args.next(), args.next()) else {
                    return Err(Error::method_not_found(method));
                };
                let target = arg_to_record(owner.schema(), def, arg)?;
                association.set(def, Assign::Record(target), owner)?;
                Ok(Value::Null)
            }
            (Association::BelongsTo(single) | Association::HasOne(single), "size") => {
                Ok(Value::BigInt(i64::from(single.target.is_some())))
            }
            _ => Err(Error::method_not_found(method)),
        }
    }

    fn items_mut(&mut self) -> &mut [Record] {
        match self {
            Association::BelongsTo(single) | Association::HasOne(single) => match &mut single.target
            {
                Some(target) => std::slice::from_mut(target.as_mut()),
                None => &mut [],
            },
            Association::HasMany(collection) => &mut collection.items,
        }
    }
}

impl Collection {
    fn set_ids(&mut self, ids: Vec<Value>) {
        self.items
            .retain(|item| ids.iter().any(|id| id.same_key(&item.id())));
        self.pending_ids = Some(ids);
    }

    fn clear(&mut self) {
        self.items.clear();
        self.pending_ids = None;
        self.replaced = true;
        self.loaded = true;
    }

    fn remove(&mut self, id: &Value) {
        let before = self.items.len();
        self.items.retain(|item| !item.id().same_key(id));
        if let Some(pending) = &mut self.pending_ids {
            pending.retain(|p| !p.same_key(id));
        }
        if !id.is_null() && (self.items.len() != before || !self.loaded) {
            self.removed.push(id.clone());
        }
    }

    fn save<C: Connection + ?Sized>(
        &mut self,
        def: &AssociationDef,
        owner: &Record,
        conn: &C,
    ) -> Result<()> {
        let owner_id = owner.id();
        if owner_id.is_null() {
            return Ok(());
        }
        let target = owner.schema().entity(def.target);
        let table = target.table_name();
        let pk = target.primary_key();
        let fk = def.foreign_key.as_str();

        for item in &mut self.items {
            link(item, fk, &owner_id)?;
            if item.is_new_record() || item.is_modified() {
                item.save(conn)?;
            }
        }
        let kept: Vec<Value> = self
            .items
            .iter()
            .map(Record::id)
            .filter(|id| !id.is_null())
            .collect();

        if let Some(ids) = self.pending_ids.take() {
            let mut listed = ids.clone();
            listed.extend(kept.iter().cloned());
            unlink_except(table, pk, fk, &owner_id, listed, conn)?;
            for id in ids.iter().filter(|id| !kept.iter().any(|k| k.same_key(id))) {
                UpdateBuilder::new(table)
                    .set(fk, owner_id.clone())
                    .filter(pk, Op::Eq, id.clone())
                    .limit(1)
                    .execute(conn)?;
            }
            self.replaced = false;
            self.removed.clear();
            // Items not in memory are now linked but unknown here.
            self.loaded = false;
        } else if self.replaced {
            unlink_except(table, pk, fk, &owner_id, kept, conn)?;
            self.replaced = false;
            self.removed.clear();
        }

        if !self.removed.is_empty() {
            UpdateBuilder::new(table)
                .set(fk, Value::Null)
                .filter(fk, Op::Eq, owner_id.clone())
                .filter(pk, Op::In, Value::Array(std::mem::take(&mut self.removed)))
                .execute(conn)?;
        }
        Ok(())
    }
}

/// The JOIN an association contributes to an eager-load query.
pub(crate) fn join_spec(schema: &Schema, owner: &EntityType, def: &AssociationDef) -> JoinSpec {
    let target = schema.entity(def.target);
    let side = match def.kind {
        AssociationKind::BelongsTo => ForeignKeySide::Parent,
        AssociationKind::HasOne | AssociationKind::HasMany => ForeignKeySide::Related,
    };
    JoinSpec {
        table: target.table_name().to_string(),
        columns: target.columns().to_vec(),
        fragment: build_join_clause(
            owner.table_name(),
            owner.primary_key(),
            target.table_name(),
            target.primary_key(),
            &def.foreign_key,
            side,
        ),
    }
}

fn dependents_of(def: &AssociationDef, owner_id: Value) -> FindOptions {
    FindOptions::new().conditions(Conditions::columns([(def.foreign_key.clone(), owner_id)]))
}

/// Write a foreign key on `record` only when it actually changes.
fn write_key(record: &mut Record, foreign_key: &str, value: Value) -> Result<()> {
    if record.raw_attribute(foreign_key) == &value {
        return Ok(());
    }
    record.set(foreign_key, Assign::Value(value))
}

/// Point a dependent at its owner, once the owner has an identity.
fn link(dependent: &mut Record, foreign_key: &str, owner_id: &Value) -> Result<()> {
    if owner_id.is_null() || dependent.raw_attribute(foreign_key).same_key(owner_id) {
        return Ok(());
    }
    dependent.set(foreign_key, Assign::Value(owner_id.clone()))
}

fn is_dirty_dependent(dependent: &Record, def: &AssociationDef, owner_id: &Value) -> bool {
    dependent.is_new_record()
        || dependent.is_modified()
        || (!owner_id.is_null() && !dependent.raw_attribute(&def.foreign_key).same_key(owner_id))
}

fn unlink_except<C: Connection + ?Sized>(
    table: &str,
    pk: &str,
    fk: &str,
    owner_id: &Value,
    keep: Vec<Value>,
    conn: &C,
) -> Result<u64> {
    UpdateBuilder::new(table)
        .set(fk, Value::Null)
        .filter(fk, Op::Eq, owner_id.clone())
        .filter(pk, Op::NotIn, Value::Array(keep))
        .execute(conn)
}

fn arg_to_record(schema: &Arc<Schema>, def: &AssociationDef, arg: Arg) -> Result<Record> {
    match arg {
        Arg::Record(record) => Ok(record),
        Arg::Attributes(pairs) => {
            let mut record = Record::instantiate(Arc::clone(schema), def.target);
            for (name, value) in pairs {
                record.set(&name, Assign::Value(value))?;
            }
            Ok(record)
        }
        Arg::Value(value) => Err(assign_mismatch(&def.name, "record", &Assign::Value(value))),
    }
}
