//! The finder's option bag and identifier forms.

use crate::conditions::Conditions;
use serde::Deserialize;
use sqlrecord_core::{Result, Value};

/// What a find request is looking for.
#[derive(Debug, Clone, PartialEq)]
pub enum Identifier {
    /// One primary key value.
    Id(Value),
    /// A list of primary key values.
    Ids(Vec<Value>),
    /// Every matching row.
    All,
    /// The first matching row.
    First,
}

impl Identifier {
    /// Does this identifier return a sequence of records?
    pub fn is_plural(&self) -> bool {
        matches!(self, Identifier::Ids(_) | Identifier::All)
    }

    /// Does this identifier name specific keys (and so fail when nothing matches)?
    pub fn is_keyed(&self) -> bool {
        matches!(self, Identifier::Id(_) | Identifier::Ids(_))
    }
}

impl From<Value> for Identifier {
    fn from(v: Value) -> Self {
        match v {
            Value::Array(ids) => Identifier::Ids(ids),
            v => Identifier::Id(v),
        }
    }
}

impl From<i64> for Identifier {
    fn from(v: i64) -> Self {
        Identifier::Id(Value::BigInt(v))
    }
}

impl From<Vec<i64>> for Identifier {
    fn from(v: Vec<i64>) -> Self {
        Identifier::Ids(v.into_iter().map(Value::BigInt).collect())
    }
}

impl From<Vec<Value>> for Identifier {
    fn from(v: Vec<Value>) -> Self {
        Identifier::Ids(v)
    }
}

/// Options for a find request.
///
/// `limit`, `order` and `group` are free text checked against a restrictive
/// character class when the query is built; `offset` must be all digits.
/// Values failing those checks are dropped rather than rejected.
///
/// # Example
///
/// ```
/// use sqlrecord_query::{Conditions, FindOptions};
///
/// let options = FindOptions::new()
///     .conditions(Conditions::positional("author = ?", ["ann"]))
///     .include("comments, author")
///     .order("created_at DESC")
///     .limit(10);
/// assert_eq!(options.include_names(), vec!["comments", "author"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub conditions: Option<Conditions>,
    pub include: Option<String>,
    pub limit: Option<String>,
    pub order: Option<String>,
    pub group: Option<String>,
    pub offset: Option<String>,
    pub select: Option<String>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conditions(mut self, conditions: impl Into<Conditions>) -> Self {
        self.conditions = Some(conditions.into());
        self
    }

    /// Associations to eager-load, separated by commas and/or whitespace.
    pub fn include(mut self, include: impl Into<String>) -> Self {
        self.include = Some(include.into());
        self
    }

    pub fn limit(mut self, limit: impl ToString) -> Self {
        self.limit = Some(limit.to_string());
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn offset(mut self, offset: impl ToString) -> Self {
        self.offset = Some(offset.to_string());
        self
    }

    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    /// The requested include names in order, empty entries removed.
    pub fn include_names(&self) -> Vec<&str> {
        self.include
            .as_deref()
            .map(|s| {
                s.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|part| !part.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Decode an option bag from JSON text.
    ///
    /// ```
    /// use sqlrecord_query::FindOptions;
    ///
    /// let options = FindOptions::from_json(
    ///     r#"{"conditions": ["name = ?", "Bob"], "limit": 5, "include": "comments"}"#,
    /// )
    /// .unwrap();
    /// assert_eq!(options.limit.as_deref(), Some("5"));
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json_value(value)
    }

    /// Decode an option bag from an already parsed JSON value.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawOptions = serde_json::from_value(value)?;
        Ok(Self {
            conditions: raw
                .conditions
                .as_ref()
                .map(Conditions::from_json)
                .transpose()?,
            include: raw.include.map(Scalar::into_string),
            limit: raw.limit.map(Scalar::into_string),
            order: raw.order.map(Scalar::into_string),
            group: raw.group.map(Scalar::into_string),
            offset: raw.offset.map(Scalar::into_string),
            select: raw.select.map(Scalar::into_string),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOptions {
    conditions: Option<serde_json::Value>,
    include: Option<Scalar>,
    limit: Option<Scalar>,
    order: Option<Scalar>,
    group: Option<Scalar>,
    offset: Option<Scalar>,
    select: Option<Scalar>,
}

/// JSON option values arrive as strings or numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }
}
