//! JSON dumps of records.
//!
//! A dump holds the record's columns plus any extra attributes a query
//! selected. Associations that have been loaded are nested under their
//! names; unloaded associations are left out.

use crate::record::{Field, Record};
use serde::{Serialize, Serializer};
use sqlrecord_core::Result;

/// Options for [`Record::dump`].
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Only these top-level keys (None = all).
    pub include: Option<Vec<String>>,
    /// Keys to leave out, at every level.
    pub exclude: Vec<String>,
    /// Drop null attributes.
    pub exclude_none: bool,
    /// Leave out loaded associations.
    pub skip_associations: bool,
    /// Pretty-print [`Record::dump_json`] output with this many spaces.
    pub indent: Option<usize>,
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn exclude_none(mut self) -> Self {
        self.exclude_none = true;
        self
    }

    pub fn skip_associations(mut self) -> Self {
        self.skip_associations = true;
        self
    }

    pub fn indent(mut self, spaces: usize) -> Self {
        self.indent = Some(spaces);
        self
    }

    fn keeps(&self, key: &str, top_level: bool) -> bool {
        let included = !top_level
            || self
                .include
                .as_ref()
                .is_none_or(|keys| keys.iter().any(|k| k == key));
        included && !self.exclude.iter().any(|k| k == key)
    }
}

impl Record {
    /// Dump this record to a JSON object.
    pub fn dump(&self, options: &DumpOptions) -> serde_json::Value {
        self.dump_level(options, true)
    }

    /// Dump this record to a JSON string.
    pub fn dump_json(&self, options: &DumpOptions) -> Result<String> {
        let value = self.dump(options);
        let Some(spaces) = options.indent else {
            return Ok(serde_json::to_string(&value)?);
        };
        let indent = " ".repeat(spaces);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut writer = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
        value.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&writer).into_owned())
    }

    fn dump_level(&self, options: &DumpOptions, top_level: bool) -> serde_json::Value {
        let mut map = serde_json::Map::new();

        for (name, value) in self.attributes() {
            if !options.keeps(name, top_level) || (options.exclude_none && value.is_null()) {
                continue;
            }
            map.insert(name.clone(), serde_json::Value::from(value));
        }
        for column in self.columns() {
            if map.contains_key(column) || self.attributes().contains_key(column) {
                continue;
            }
            if options.keeps(column, top_level) && !options.exclude_none {
                map.insert(column.clone(), serde_json::Value::Null);
            }
        }

        if !options.skip_associations {
            for def in self.entity().associations() {
                let Some(association) = self.association(&def.name) else {
                    continue;
                };
                if !association.is_loaded() || !options.keeps(&def.name, top_level) {
                    continue;
                }
                let nested = match association.get() {
                    Field::One(Some(target)) => target.dump_level(options, false),
                    Field::One(None) => serde_json::Value::Null,
                    Field::Many(items) => serde_json::Value::Array(
                        items
                            .iter()
                            .map(|item| item.dump_level(options, false))
                            .collect(),
                    ),
                    Field::Value(_) | Field::Ids(_) => continue,
                };
                map.insert(def.name.clone(), nested);
            }
        }

        serde_json::Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.dump(&DumpOptions::default()).serialize(serializer)
    }
}
