//! Saving and destroying records.
//!
//! `save` runs in a fixed order:
//!
//! 1. `before_save`
//! 2. belongs-to targets that need it are saved and their ids copied into
//!    this record's foreign keys
//! 3. INSERT (new record, wrapped in `before_create`/`after_create`) or
//!    UPDATE (modified record, wrapped in `before_update`/`after_update`)
//! 4. has-one and has-many dependents are pointed at this record and saved
//! 5. `after_save`
//!
//! Nothing is wrapped in a transaction. A failure part way through leaves
//! earlier writes in place.

use crate::hooks::LifecycleEvent;
use crate::record::{Assign, Record};
use crate::schema::AssociationKind;
use sqlrecord_core::{Connection, Error, Result, Value};
use sqlrecord_query::{DeleteBuilder, InsertBuilder, Op, UpdateBuilder};
use std::sync::Arc;

impl Record {
    /// Insert or update this record and cascade through its associations.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(entity = self.entity().name(), new = self.is_new_record())
    )]
    pub fn save<C: Connection + ?Sized>(&mut self, conn: &C) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::object_frozen(self.entity().name()));
        }
        self.run_hook(LifecycleEvent::BeforeSave)?;

        self.save_associations(conn, |kind| kind == AssociationKind::BelongsTo)?;

        if self.is_new_record() {
            self.insert_row(conn)?;
        } else if self.is_modified() {
            self.update_row(conn)?;
        } else {
            tracing::trace!("Record unchanged, nothing to write");
        }

        self.save_associations(conn, |kind| kind != AssociationKind::BelongsTo)?;

        self.run_hook(LifecycleEvent::AfterSave)
    }

    fn save_associations<C: Connection + ?Sized>(
        &mut self,
        conn: &C,
        phase: impl Fn(AssociationKind) -> bool,
    ) -> Result<()> {
        for index in 0..self.association_count() {
            self.with_association(index, |association, def, owner| {
                if !phase(def.kind) || !association.needs_saving(def, owner) {
                    return Ok(());
                }
                association.save_as_needed(def, owner, conn)
            })?;
        }
        Ok(())
    }

    fn insert_row<C: Connection + ?Sized>(&mut self, conn: &C) -> Result<()> {
        self.run_hook(LifecycleEvent::BeforeCreate)?;

        let schema = Arc::clone(self.schema());
        let entity = schema.entity(self.entity_id());
        let pk = entity.primary_key();
        // An explicitly assigned key is inserted as given.
        let explicit_key = !self.id().is_null();

        let columns: Vec<&str> = entity
            .columns()
            .iter()
            .map(String::as_str)
            .filter(|column| explicit_key || *column != pk)
            .collect();
        let values: Vec<Value> = columns
            .iter()
            .map(|column| self.raw_attribute(column).clone())
            .collect();

        let id = InsertBuilder::new(entity.table_name(), columns)
            .values(values)
            .execute(conn)?;
        if !explicit_key {
            self.store_clean(pk, id);
        }
        self.mark_saved();
        tracing::debug!(id = ?self.id(), "Inserted");

        self.run_hook(LifecycleEvent::AfterCreate)
    }

    fn update_row<C: Connection + ?Sized>(&mut self, conn: &C) -> Result<()> {
        self.run_hook(LifecycleEvent::BeforeUpdate)?;

        let schema = Arc::clone(self.schema());
        let entity = schema.entity(self.entity_id());
        let pk = entity.primary_key();

        let assignments: Vec<(&str, Value)> = entity
            .columns()
            .iter()
            .filter(|column| *column != pk)
            .map(|column| (column.as_str(), self.raw_attribute(column).clone()))
            .collect();
        if !assignments.is_empty() {
            let affected = UpdateBuilder::new(entity.table_name())
                .set_all(assignments)
                .filter(pk, Op::Eq, self.id())
                .limit(1)
                .execute(conn)?;
            tracing::debug!(affected, "Updated");
        }
        self.mark_saved();

        self.run_hook(LifecycleEvent::AfterUpdate)
    }

    /// Cascade to dependents, delete this record's row and freeze it.
    ///
    /// A record that was never saved issues no DELETE. Always returns
    /// `true` on success.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = self.entity().name()))]
    pub fn destroy<C: Connection + ?Sized>(&mut self, conn: &C) -> Result<bool> {
        if self.is_frozen() {
            return Err(Error::object_frozen(self.entity().name()));
        }
        self.run_hook(LifecycleEvent::BeforeDestroy)?;

        for index in 0..self.association_count() {
            self.with_association(index, |association, def, owner| {
                association.destroy(def, owner, conn)
            })?;
        }

        if !self.is_new_record() {
            let affected = DeleteBuilder::new(self.table_name())
                .filter(self.primary_key(), Op::Eq, self.id())
                .limit(1)
                .execute(conn)?;
            tracing::debug!(affected, "Deleted");
        }
        self.freeze();

        self.run_hook(LifecycleEvent::AfterDestroy)?;
        Ok(true)
    }

    /// Write every pair through [`set`](Record::set), then [`save`](Record::save).
    pub fn update_attributes<C, I, K, V>(&mut self, attributes: I, conn: &C) -> Result<()>
    where
        C: Connection + ?Sized,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Assign>,
    {
        for (name, value) in attributes {
            self.set(name.as_ref(), value)?;
        }
        self.save(conn)
    }
}
