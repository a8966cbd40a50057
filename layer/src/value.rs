//! Field values stored on specs.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A point on the time line at which an attribute holds a sample.
///
/// Ordered with [`f64::total_cmp`] so it can key a [`BTreeMap`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeCode(pub f64);

impl TimeCode {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for TimeCode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimeCode {}

impl PartialOrd for TimeCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for TimeCode {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

/// Time-sampled values of an attribute, keyed by time.
pub type TimeSampleMap = BTreeMap<TimeCode, Value>;

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Token(String),
    /// Ordered child names (`primChildren`, `propertyChildren`).
    TokenList(Vec<String>),
    Array(Vec<Value>),
    Dictionary(BTreeMap<String, Value>),
    TimeSamples(TimeSampleMap),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) | Self::Token(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_token_list(&self) -> Option<&[String]> {
        match self {
            Self::TokenList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Dictionary(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_time_samples(&self) -> Option<&TimeSampleMap> {
        match self {
            Self::TimeSamples(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}
