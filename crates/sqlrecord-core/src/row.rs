//! Result rows and typed value extraction.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::Value;

/// One row returned by [`Connection::query`](crate::Connection::query).
///
/// Cells stay in select-list order. For eager-load queries the names are
/// the `tN_rM` aliases of the generated select list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    names: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// A row from parallel name and value lists.
    ///
    /// Extra names or values beyond the shorter list are dropped.
    pub fn new(mut names: Vec<String>, mut values: Vec<Value>) -> Self {
        let len = names.len().min(values.len());
        if names.len() != values.len() {
            tracing::warn!(
                names = names.len(),
                values = values.len(),
                "Row names and values differ in length, truncating"
            );
        }
        names.truncate(len);
        values.truncate(len);
        Self { names, values }
    }

    /// Build a row from `(column, value)` pairs.
    ///
    /// ```
    /// use sqlrecord_core::{Row, Value};
    ///
    /// let row = Row::from_pairs([("id", Value::BigInt(1)), ("title", "Hello".into())]);
    /// assert_eq!(row.get("title"), Some(&Value::from("Hello")));
    /// ```
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let (names, values) = pairs.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        Self { names, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The cell named `name`. With duplicate names the first one wins.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
    }

    /// Typed access to the cell named `name`.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get(name).ok_or_else(|| {
            Error::Type(TypeError {
                expected: std::any::type_name::<T>(),
                actual: "missing column".to_string(),
                column: Some(name.to_string()),
                rust_type: None,
            })
        })?;
        from_named_value(name, value)
    }

    /// `(column, value)` pairs in select order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(String::as_str).zip(&self.values)
    }
}

/// Conversion out of a dynamic [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

/// Convert `value`, naming the column in any type error.
pub fn from_named_value<T: FromValue>(name: &str, value: &Value) -> Result<T> {
    T::from_value(value).map_err(|err| match err {
        Error::Type(mut te) => {
            tracing::trace!(
                column = name,
                expected = te.expected,
                actual = %te.actual,
                "Value conversion failed"
            );
            te.column = Some(name.to_string());
            Error::Type(te)
        }
        other => other,
    })
}

fn type_error(expected: &'static str, value: &Value) -> Error {
    Error::Type(TypeError {
        expected,
        actual: value.type_name().to_string(),
        column: None,
        rust_type: None,
    })
}

macro_rules! from_value_via {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self> {
                    value.$method().ok_or_else(|| type_error(stringify!($ty), value))
                }
            }
        )*
    };
}

from_value_via!(bool => as_bool, i64 => as_i64, f64 => as_f64);

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| type_error("String", value))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}
