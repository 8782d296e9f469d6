//! Finding records and rebuilding them from joined rows.

use crate::model::Model;
use crate::record::Record;
use sqlrecord_core::{Connection, Error, Result, Row, Value};
use sqlrecord_query::{FindOptions, FindQuery, Identifier, generate_find_query, transform_row};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The result of [`Model::find`].
#[derive(Debug, Clone)]
pub enum Found {
    /// `Id` and `First` requests.
    One(Option<Record>),
    /// `Ids` and `All` requests, in row order.
    Many(Vec<Record>),
}

impl Found {
    pub fn into_vec(self) -> Vec<Record> {
        match self {
            Found::One(record) => record.into_iter().collect(),
            Found::Many(records) => records,
        }
    }

    /// The single record, or the first of many.
    pub fn into_one(self) -> Option<Record> {
        match self {
            Found::One(record) => record,
            Found::Many(records) => records.into_iter().next(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Found::One(record) => usize::from(record.is_some()),
            Found::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Model {
    /// Run a find request.
    ///
    /// - `Id` with no matching row and `Ids` with none at all fail with
    ///   `RecordNotFound`.
    /// - An empty `Ids` list returns an empty result without querying.
    /// - `All` and `First` never fail for lack of rows.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = self.entity().name()))]
    pub fn find<C: Connection + ?Sized>(
        &self,
        identifier: impl Into<Identifier>,
        options: &FindOptions,
        conn: &C,
    ) -> Result<Found> {
        let identifier = identifier.into();
        if matches!(&identifier, Identifier::Ids(ids) if ids.is_empty()) {
            return Ok(Found::Many(Vec::new()));
        }

        let query = generate_find_query(self, &identifier, options);
        tracing::trace!(sql = %query.query, "Executing find");
        let rows = conn.query(&query.query)?;

        let records = if query.is_joined() {
            self.demultiplex(&rows, &query)
        } else {
            rows.iter().map(|row| self.record_from_row(row)).collect()
        };
        tracing::debug!(rows = rows.len(), records = records.len(), "Find complete");

        if records.is_empty() && identifier.is_keyed() {
            return Err(Error::record_not_found(self.entity().name()));
        }
        if identifier.is_plural() {
            Ok(Found::Many(records))
        } else {
            Ok(Found::One(records.into_iter().next()))
        }
    }

    /// Find one record by primary key.
    pub fn find_by_id<C: Connection + ?Sized>(
        &self,
        id: impl Into<Value>,
        conn: &C,
    ) -> Result<Record> {
        self.find(Identifier::Id(id.into()), &FindOptions::new(), conn)?
            .into_one()
            .ok_or_else(|| Error::record_not_found(self.entity().name()))
    }

    /// Find several records by primary key.
    pub fn find_ids<C: Connection + ?Sized>(
        &self,
        ids: Vec<Value>,
        options: &FindOptions,
        conn: &C,
    ) -> Result<Vec<Record>> {
        Ok(self.find(Identifier::Ids(ids), options, conn)?.into_vec())
    }

    /// Find every matching record.
    pub fn find_all<C: Connection + ?Sized>(
        &self,
        options: &FindOptions,
        conn: &C,
    ) -> Result<Vec<Record>> {
        Ok(self.find(Identifier::All, options, conn)?.into_vec())
    }

    /// Find the first matching record, if any.
    pub fn find_first<C: Connection + ?Sized>(
        &self,
        options: &FindOptions,
        conn: &C,
    ) -> Result<Option<Record>> {
        Ok(self.find(Identifier::First, options, conn)?.into_one())
    }

    fn record_from_row(&self, row: &Row) -> Record {
        Record::from_fragment(
            Arc::clone(self.schema()),
            self.id(),
            row.iter().map(|(name, value)| (name.to_string(), value.clone())),
        )
    }

    /// Fold joined rows into distinct base records with their eager-loaded
    /// associations attached.
    fn demultiplex(&self, rows: &[Row], query: &FindQuery) -> Vec<Record> {
        let entity = self.entity();
        let included: Vec<Option<usize>> = query
            .includes
            .iter()
            .map(|name| entity.association(name).map(|(index, _)| index))
            .collect();

        let mut records: Vec<Record> = Vec::new();
        let mut bases: Vec<Vec<(String, Value)>> = Vec::new();
        let mut by_key: HashMap<u64, Vec<usize>> = HashMap::new();

        for row in rows {
            let mut fragments = transform_row(row, &query.column_lookup);
            let Some(position) = fragments.iter().position(|f| f.table_index == 0) else {
                continue;
            };
            let base = fragments.remove(position);

            let key = identity_key(&base.attributes);
            let candidates = by_key.entry(key).or_default();
            let existing = candidates
                .iter()
                .copied()
                .find(|&i| bases[i] == base.attributes);
            let index = match existing {
                Some(index) => index,
                None => {
                    let mut record = Record::from_fragment(
                        Arc::clone(self.schema()),
                        self.id(),
                        base.attributes.iter().cloned(),
                    );
                    for index in included.iter().flatten() {
                        record.association_mut(*index).mark_loaded();
                    }
                    records.push(record);
                    bases.push(base.attributes);
                    candidates.push(records.len() - 1);
                    records.len() - 1
                }
            };

            for fragment in fragments {
                if fragment.is_empty_match() {
                    continue;
                }
                let Some(Some(association)) = included.get(fragment.table_index - 1).copied()
                else {
                    continue;
                };
                let target = entity.associations()[association].target;
                let related =
                    Record::from_fragment(Arc::clone(self.schema()), target, fragment.attributes);
                records[index]
                    .association_mut(association)
                    .populate_from_find(related);
            }
        }
        records
    }
}

/// Stable hash of a base-table fragment, in select order.
fn identity_key(attributes: &[(String, Value)]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for (name, value) in attributes {
        name.hash(&mut hasher);
        value.hash_into(&mut hasher);
    }
    hasher.finish()
}
