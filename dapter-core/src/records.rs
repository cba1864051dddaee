//! Shapes exchanged between callers, the dispatch layer and adapters.

use std::borrow::Cow;

use serde_json::Value;

use crate::error::{AdapterError, AdapterResult};
use crate::options::Options;

/// One record or a sequence of records.
#[derive(Debug, Clone, PartialEq)]
pub enum Records<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Records<T> {
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(item) => std::slice::from_ref(item),
            Self::Many(items) => items,
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }

    /// Unwrap a single record.
    ///
    /// A sequence of exactly one record is accepted; any other length is a
    /// `ValidationError`.
    pub fn into_one(self) -> AdapterResult<T> {
        match self {
            Self::One(item) => Ok(item),
            Self::Many(items) => {
                let count = items.len();
                let mut iter = items.into_iter();
                match (iter.next(), iter.next()) {
                    (Some(item), None) => Ok(item),
                    _ => Err(AdapterError::validation(format!(
                        "Expected exactly one record, found {count}"
                    ))
                    .with("count", count)),
                }
            }
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Records<U> {
        match self {
            Self::One(item) => Records::One(f(item)),
            Self::Many(items) => Records::Many(items.into_iter().map(f).collect()),
        }
    }

    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<Records<U>, E> {
        match self {
            Self::One(item) => f(item).map(Records::One),
            Self::Many(items) => items
                .into_iter()
                .map(f)
                .collect::<Result<Vec<_>, E>>()
                .map(Records::Many),
        }
    }
}

/// An external representation produced or consumed by an adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Representation {
    Text(String),
    Bytes(Vec<u8>),
    /// Structured data: store queries, write acknowledgements, parsed documents.
    Value(Value),
}

impl Representation {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Value(_) => "value",
        }
    }

    /// Borrow the representation as text.
    pub fn as_text(&self) -> AdapterResult<Cow<'_, str>> {
        match self {
            Self::Text(text) => Ok(Cow::Borrowed(text)),
            Self::Value(Value::String(text)) => Ok(Cow::Borrowed(text)),
            Self::Bytes(bytes) => std::str::from_utf8(bytes).map(Cow::Borrowed).map_err(|e| {
                AdapterError::parse(format!("Representation is not valid UTF-8: {e}"))
                    .with_source(e)
            }),
            Self::Value(_) => Err(AdapterError::validation(
                "Expected a textual representation, found a structured value",
            )
            .with("representation", self.kind_name())),
        }
    }

    pub fn into_text(self) -> AdapterResult<String> {
        match self {
            Self::Text(text) | Self::Value(Value::String(text)) => Ok(text),
            Self::Bytes(bytes) => String::from_utf8(bytes).map_err(|e| {
                AdapterError::parse(format!("Representation is not valid UTF-8: {e}"))
                    .with_source(e)
            }),
            Self::Value(_) => Err(AdapterError::validation(
                "Expected a textual representation, found a structured value",
            )
            .with("representation", "value")),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl From<String> for Representation {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Representation {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Representation {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Value> for Representation {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Facts about the current call, handed to an adapter with its options.
#[derive(Debug, Clone, Copy)]
pub struct Conversion<'a> {
    /// Diagnostic name of the record type being converted.
    pub record_type: &'a str,
    /// Whether the caller works with a sequence of records.
    pub many: bool,
    pub options: &'a Options,
}

impl<'a> Conversion<'a> {
    pub fn new(record_type: &'a str, many: bool, options: &'a Options) -> Self {
        Self {
            record_type,
            many,
            options,
        }
    }
}
