//! Error taxonomy shared by adapters, registries and dispatch.
//!
//! Every failure surfaced by this workspace is an [`AdapterError`]: a kind
//! tag from [`ErrorKind`], a message, ordered key/value [`Context`], and an
//! optional lower-level cause reachable through `std::error::Error::source`.

use std::fmt;

use thiserror::Error;

/// Boxed lower-level cause attached to an [`AdapterError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for adapter, registry and dispatch operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Kind tag of an [`AdapterError`].
///
/// Kinds form a shallow hierarchy (see [`ErrorKind::parent`]). New failure
/// classes get a new kind rather than reusing an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Generic adapter failure; root of the hierarchy.
    Adapter,
    /// No plugin registered under the requested key.
    AdapterNotFound,
    /// A plugin was registered or configured incorrectly.
    Configuration,
    /// Data failed the target type's structural constraints.
    Validation,
    /// A value has no mapping between the record and the external format.
    TypeConversion,
    /// The external representation is not well-formed.
    Parse,
    /// A backend could not be reached or refused the connection.
    Connection,
    /// A backend rejected a query.
    Query,
    /// A named resource (table, collection, file) does not exist.
    Resource,
    /// Generic migration failure.
    Migration,
    MigrationInit,
    MigrationCreation,
    MigrationUpgrade,
    MigrationDowngrade,
    MigrationNotFound,
}

impl ErrorKind {
    /// Stable name used in logs and diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Adapter => "AdapterError",
            Self::AdapterNotFound => "AdapterNotFoundError",
            Self::Configuration => "ConfigurationError",
            Self::Validation => "ValidationError",
            Self::TypeConversion => "TypeConversionError",
            Self::Parse => "ParseError",
            Self::Connection => "ConnectionError",
            Self::Query => "QueryError",
            Self::Resource => "ResourceError",
            Self::Migration => "MigrationError",
            Self::MigrationInit => "MigrationInitError",
            Self::MigrationCreation => "MigrationCreationError",
            Self::MigrationUpgrade => "MigrationUpgradeError",
            Self::MigrationDowngrade => "MigrationDowngradeError",
            Self::MigrationNotFound => "MigrationNotFoundError",
        }
    }

    /// Machine-checkable status code, HTTP flavoured.
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Parse => 400,
            Self::AdapterNotFound | Self::Resource | Self::MigrationNotFound => 404,
            Self::Validation | Self::TypeConversion => 422,
            Self::Query => 502,
            Self::Connection => 503,
            Self::Adapter
            | Self::Configuration
            | Self::Migration
            | Self::MigrationInit
            | Self::MigrationCreation
            | Self::MigrationUpgrade
            | Self::MigrationDowngrade => 500,
        }
    }

    /// The kind this one specializes, `None` for the root.
    pub const fn parent(self) -> Option<ErrorKind> {
        match self {
            Self::Adapter => None,
            Self::TypeConversion => Some(Self::Validation),
            Self::MigrationInit
            | Self::MigrationCreation
            | Self::MigrationUpgrade
            | Self::MigrationDowngrade
            | Self::MigrationNotFound => Some(Self::Migration),
            _ => Some(Self::Adapter),
        }
    }

    /// Returns true if `self` is `ancestor` or specializes it.
    pub fn is_a(self, ancestor: ErrorKind) -> bool {
        std::iter::successors(Some(self), |kind| kind.parent()).any(|kind| kind == ancestor)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single structured context value.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
}

impl ContextValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&String> for ContextValue {
    fn from(s: &String) -> Self {
        Self::Str(s.clone())
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for ContextValue {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u32> for ContextValue {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u64> for ContextValue {
    fn from(n: u64) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<usize> for ContextValue {
    fn from(n: usize) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ContextValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<Vec<String>> for ContextValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<ContextValue>> From<Option<T>> for ContextValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Ordered key/value context attached to an error.
///
/// Keys keep their first insertion position; inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    entries: Vec<(String, ContextValue)>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return Ok(());
        }
        f.write_str(" (")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str(")")
    }
}

/// A structured, kind-tagged failure.
///
/// Built once where the failure is detected, then propagated unchanged.
/// The builder methods consume `self`, so an error is complete by the time
/// anything else can observe it.
#[derive(Debug, Error)]
#[error("{message}{context}")]
pub struct AdapterError {
    kind: ErrorKind,
    message: String,
    context: Context,
    #[source]
    source: Option<BoxError>,
}

impl AdapterError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Context::new(),
            source: None,
        }
    }

    pub fn adapter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Adapter, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AdapterNotFound, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeConversion, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Query, message)
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resource, message)
    }

    pub fn migration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Migration, message)
    }

    pub fn migration_init(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MigrationInit, message)
    }

    pub fn migration_creation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MigrationCreation, message)
    }

    pub fn migration_upgrade(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MigrationUpgrade, message)
    }

    pub fn migration_downgrade(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MigrationDowngrade, message)
    }

    pub fn migration_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MigrationNotFound, message)
    }

    /// Attach a context entry.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.context.insert(key, value);
        self
    }

    /// Attach the lower-level cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_value(&self, key: &str) -> Option<&ContextValue> {
        self.context.get(key)
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    /// Whether this error's kind is `kind` or specializes it.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind.is_a(kind)
    }

    /// The wrapped lower-level cause, if any.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        use serde_json::error::Category;

        let kind = match e.classify() {
            Category::Syntax | Category::Eof => ErrorKind::Parse,
            Category::Data => ErrorKind::Validation,
            Category::Io => ErrorKind::Resource,
        };
        Self::new(kind, e.to_string())
            .with("line", e.line())
            .with("column", e.column())
            .with_source(e)
    }
}

/// Shorten `text` for inclusion in error context.
pub fn excerpt(text: &str) -> String {
    const LIMIT: usize = 120;

    match text.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}
