use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AdapterError, AdapterResult, excerpt};
use crate::lenient::Lenient;

/// A record type that can be carried through adapters.
///
/// Implemented explicitly, usually with an empty body:
///
/// ```
/// use dapter_core::Record;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Trade {
///     id: i64,
///     symbol: String,
/// }
///
/// impl Record for Trade {}
///
/// assert_eq!(Trade::record_name(), "Trade");
/// ```
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name used in error context and logs.
    fn record_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Strip the module path from a type name, keeping generic arguments intact.
pub fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Dump a record into the adapter data model.
pub(crate) fn encode<T: Record>(record: &T) -> AdapterResult<Value> {
    serde_json::to_value(record).map_err(|e| {
        AdapterError::type_conversion(format!(
            "Cannot express {} in the adapter data model",
            T::record_name()
        ))
        .with("model_name", T::record_name())
        .with("original_error", e.to_string())
        .with_source(e)
    })
}

/// Validate adapter output back into a record.
///
/// Values are read strictly first. When that fails, text values are given a
/// second chance against the field types (`"42"` for an integer field), which
/// is how untyped formats such as CSV come back. The strict error is the one
/// reported.
pub(crate) fn decode<T: Record>(value: Value, obj_key: &str) -> AdapterResult<T> {
    T::deserialize(&value)
        .or_else(|strict| T::deserialize(Lenient(&value)).map_err(|_| strict))
        .map_err(|e| {
            let detail = e.to_string();
            let mut err = AdapterError::validation(format!(
                "Data from '{obj_key}' does not match {}",
                T::record_name()
            ))
            .with("model_name", T::record_name())
            .with("obj_key", obj_key);
            if let Some(field) = offending_field(&detail) {
                err = err.with("field", field);
            }
            err.with("data", excerpt(&value.to_string()))
                .with("original_error", detail)
                .with_source(e)
        })
}

/// Pull the field name out of serde's "missing field `x`" style messages.
fn offending_field(detail: &str) -> Option<&str> {
    let rest = ["missing field `", "unknown field `", "duplicate field `"]
        .iter()
        .find_map(|prefix| detail.find(prefix).map(|at| &detail[at + prefix.len()..]))?;
    rest.split('`').next()
}
