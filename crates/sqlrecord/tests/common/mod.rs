//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use sqlrecord::{AssociationOptions, Connection, Dependent, EntityBuilder, Error, Schema, Value};
use sqlrecord_core::{QueryError, QueryErrorKind, Row};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct MockState {
    /// Every statement received, in order.
    pub statements: Vec<String>,
    /// Canned rows, matched by SQL prefix.
    pub responses: Vec<(String, Vec<Row>)>,
    /// Statements starting with this prefix fail.
    pub fail_on: Option<String>,
    pub next_id: i64,
}

/// Records SQL and replays canned rows.
#[derive(Debug, Clone)]
pub struct MockConnection {
    pub state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                next_id: 1,
                ..MockState::default()
            })),
        }
    }

    pub fn respond(&self, sql_prefix: &str, rows: Vec<Row>) {
        self.state
            .lock()
            .unwrap()
            .responses
            .push((sql_prefix.to_string(), rows));
    }

    pub fn fail_on(&self, sql_prefix: &str) {
        self.state.lock().unwrap().fail_on = Some(sql_prefix.to_string());
    }

    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().statements.clear();
    }

    fn record(&self, sql: &str) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());
        match &state.fail_on {
            Some(prefix) if sql.starts_with(prefix.as_str()) => {
                Err(Error::Query(QueryError {
                    kind: QueryErrorKind::Database,
                    sql: Some(sql.to_string()),
                    message: "mock failure".to_string(),
                    source: None,
                }))
            }
            _ => Ok(()),
        }
    }
}

impl Connection for MockConnection {
    fn query(&self, sql: &str) -> sqlrecord::Result<Vec<Row>> {
        self.record(sql)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .responses
            .iter()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    fn execute(&self, sql: &str) -> sqlrecord::Result<u64> {
        self.record(sql)?;
        Ok(1)
    }

    fn insert(&self, sql: &str) -> sqlrecord::Result<Value> {
        self.record(sql)?;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        Ok(Value::BigInt(id))
    }
}

/// Users write posts; posts have comments and one summary.
pub fn blog() -> Arc<Schema> {
    blog_builder().build().unwrap()
}

pub fn blog_builder() -> sqlrecord::SchemaBuilder {
    Schema::builder()
        .entity(EntityBuilder::new("User").columns(["id", "name"]))
        .entity(
            EntityBuilder::new("Post")
                .columns(["id", "title", "author_id"])
                .belongs_to("author", AssociationOptions::new().class_name("User"))
                .has_many("comments", AssociationOptions::new())
                .has_one(
                    "summary",
                    AssociationOptions::new().dependent(Dependent::Destroy),
                ),
        )
        .entity(
            EntityBuilder::new("Comment")
                .columns(["id", "body", "post_id"])
                .belongs_to("post", AssociationOptions::new()),
        )
        .entity(EntityBuilder::new("Summary").columns(["id", "text", "post_id"]))
}

/// A post as if loaded from the database.
pub fn persisted_post(schema: &Arc<Schema>, id: i64, title: &str) -> sqlrecord::Record {
    sqlrecord::Record::with_attributes(
        schema,
        "Post",
        [("id", Value::BigInt(id)), ("title", Value::from(title))],
        false,
        false,
    )
    .unwrap()
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    Row::from_pairs(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())))
}
