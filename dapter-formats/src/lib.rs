//! Built-in format adapters for dapter.
//!
//! - `json`: JSON text, pretty by default
//! - `csv`: delimited text with a header row
//! - `toml`: TOML tables, batches under an `items` array
//! - `memory` / `async_memory`: an in-process document store
//!
//! [`FormatConfig`] reads the text formats' settings from `dapter.toml`.

pub mod config;
pub mod csv;
pub mod json;
pub mod memory;
pub mod toml;

use serde_json::Value;

pub use self::config::{CsvConfig, FormatConfig, JsonConfig, TomlConfig};
pub use self::csv::{CSV_KEY, CsvAdapter};
pub use self::json::{JSON_KEY, JsonAdapter};
pub use self::memory::{
    ASYNC_MEMORY_KEY, AsyncMemoryAdapter, MEMORY_KEY, MemoryAdapter, MemoryStore,
};
pub use self::toml::{TOML_KEY, TomlAdapter};

/// JSON type name of `value`, for error context.
pub(crate) fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
