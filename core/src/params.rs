//! Typed parameter values and the ordered parameter mapping.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;

/// A single parameter value.
///
/// Only [`ParamValue::Time`] gets special treatment in query strings (epoch
/// milliseconds); every other variant is sent as its string form.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Time(DateTime<Utc>),
    Range(Box<ParamValue>, Box<ParamValue>),
    List(Vec<ParamValue>),
}

impl ParamValue {
    pub fn range(begin: impl Into<ParamValue>, end: impl Into<ParamValue>) -> Self {
        ParamValue::Range(Box::new(begin.into()), Box::new(end.into()))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(value) => f.write_str(value),
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::Float(value) => write!(f, "{value:?}"),
            ParamValue::Bool(value) => write!(f, "{value}"),
            ParamValue::Time(value) => {
                f.write_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            ParamValue::Range(begin, end) => write!(f, "{begin}..{end}"),
            ParamValue::List(values) => {
                f.write_str("[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Str(value.clone())
    }
}

macro_rules! int_param {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ParamValue {
            fn from(value: $ty) -> Self {
                ParamValue::Int(i64::from(value))
            }
        })*
    };
}

int_param!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        ParamValue::Time(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue> + Clone> From<&[T]> for ParamValue {
    fn from(values: &[T]) -> Self {
        ParamValue::List(values.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<std::ops::Range<T>> for ParamValue {
    fn from(range: std::ops::Range<T>) -> Self {
        ParamValue::range(range.start, range.end)
    }
}

impl<T: Into<ParamValue>> From<std::ops::RangeInclusive<T>> for ParamValue {
    fn from(range: std::ops::RangeInclusive<T>) -> Self {
        let (begin, end) = range.into_inner();
        ParamValue::range(begin, end)
    }
}

/// Ordered key → value mapping for one call.
///
/// Insertion order is preserved and drives the query string order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(IndexMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace `key`, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Remove `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}
