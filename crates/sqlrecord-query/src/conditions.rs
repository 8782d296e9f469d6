//! Translation of `conditions` into WHERE fragments.
//!
//! Three shapes are accepted, each with its own constructor:
//!
//! ```
//! use sqlrecord_query::Conditions;
//!
//! assert_eq!(Conditions::raw("age > 5").to_where(), "( age > 5 )");
//! assert_eq!(
//!     Conditions::positional("name = ?", ["Bob"]).to_where(),
//!     "( name = 'Bob' )"
//! );
//! assert_eq!(
//!     Conditions::columns([("status", "active".into()), ("id", vec![1_i64, 2, 3].into())])
//!         .to_where(),
//!     "( status = 'active' AND id IN ( 1, 2, 3 ) )"
//! );
//! ```
//!
//! Raw strings are trusted and inserted verbatim. Bound values are always
//! rendered through [`Value::to_sql_literal`].

use regex::{Captures, Regex};
use sqlrecord_core::{Error, Result, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A filter for a find request.
#[derive(Debug, Clone, PartialEq)]
pub enum Conditions {
    /// Trusted SQL, wrapped in parentheses verbatim.
    Raw(String),
    /// Template with `?` placeholders filled left to right.
    Positional {
        template: String,
        values: Vec<Value>,
    },
    /// Template with `:name` placeholders.
    Named {
        template: String,
        values: BTreeMap<String, Value>,
    },
    /// `column = value` pairs joined with AND; arrays render as `IN`.
    Columns(Vec<(String, Value)>),
}

fn named_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `::` is a cast, not a placeholder.
    RE.get_or_init(|| {
        Regex::new(r"(^|[^:]):([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder pattern is valid")
    })
}

impl Conditions {
    pub fn raw(sql: impl Into<String>) -> Self {
        Conditions::Raw(sql.into())
    }

    pub fn positional<I, V>(template: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Conditions::Positional {
            template: template.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn named<I, K, V>(template: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Conditions::Named {
            template: template.into(),
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn columns<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Conditions::Columns(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Decode the loosely-typed JSON form used by serialized option bags.
    ///
    /// - a string is raw SQL
    /// - an array is a template followed by positional values, or by a
    ///   single object of named values
    /// - an object maps columns to values
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Ok(Conditions::Raw(s.clone())),
            serde_json::Value::Array(items) => {
                let Some(serde_json::Value::String(template)) = items.first() else {
                    return Err(Error::Serde(
                        "conditions array must start with a template string".to_string(),
                    ));
                };
                let rest = &items[1..];
                if let [serde_json::Value::Object(map)] = rest {
                    return Ok(Conditions::named(
                        template.clone(),
                        map.iter().map(|(k, v)| (k.clone(), Value::from(v.clone()))),
                    ));
                }
                Ok(Conditions::positional(
                    template.clone(),
                    rest.iter().cloned().map(Value::from),
                ))
            }
            serde_json::Value::Object(map) => Ok(Conditions::columns(
                map.iter().map(|(k, v)| (k.clone(), Value::from(v.clone()))),
            )),
            other => Err(Error::Serde(format!(
                "conditions must be a string, array or object, got {other}"
            ))),
        }
    }

    /// Render the WHERE fragment, parenthesized.
    ///
    /// An empty column list renders as an empty string, which callers treat
    /// as "no filter".
    pub fn to_where(&self) -> String {
        match self {
            Conditions::Raw(sql) => format!("( {sql} )"),
            Conditions::Positional { template, values } => {
                let mut values = values.iter();
                let mut out = String::with_capacity(template.len() + 16);
                for c in template.chars() {
                    if c != '?' {
                        out.push(c);
                        continue;
                    }
                    match values.next() {
                        Some(v) => out.push_str(&v.to_sql_literal()),
                        None => out.push('?'),
                    }
                }
                format!("( {out} )")
            }
            Conditions::Named { template, values } => {
                let out = named_placeholder().replace_all(template, |caps: &Captures<'_>| {
                    let name = &caps[2];
                    match values.get(name) {
                        Some(v) => format!("{}{}", &caps[1], v.to_sql_literal()),
                        None => caps[0].to_string(),
                    }
                });
                format!("( {out} )")
            }
            Conditions::Columns(pairs) => {
                if pairs.is_empty() {
                    return String::new();
                }
                let parts: Vec<String> = pairs
                    .iter()
                    .map(|(column, value)| match value {
                        Value::Null => format!("{column} IS NULL"),
                        Value::Array(items) if items.is_empty() => {
                            format!("{column} IN ( NULL )")
                        }
                        Value::Array(_) => format!("{column} IN ( {} )", value.to_sql_literal()),
                        v => format!("{column} = {}", v.to_sql_literal()),
                    })
                    .collect();
                format!("( {} )", parts.join(" AND "))
            }
        }
    }
}

impl From<&str> for Conditions {
    fn from(sql: &str) -> Self {
        Conditions::Raw(sql.to_string())
    }
}

impl From<String> for Conditions {
    fn from(sql: String) -> Self {
        Conditions::Raw(sql)
    }
}
