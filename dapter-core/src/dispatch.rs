//! Resolve, invoke, normalize.
//!
//! Every conversion is a single transaction against a read-only registry:
//! resolve the adapter for the record type, dump or validate records through
//! the neutral data model, and turn whatever the adapter raised into an
//! [`AdapterError`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::adapter::{Adapter, AdapterTable};
use crate::error::{AdapterError, AdapterResult};
use crate::options::Options;
use crate::record::{Record, decode, encode};
use crate::records::{Conversion, Records, Representation};

/// Which way a conversion runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Records to an external representation.
    To,
    /// External representation to records.
    From,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::To => f.write_str("to"),
            Self::From => f.write_str("from"),
        }
    }
}

/// Fold an adapter failure into the taxonomy.
///
/// Errors that already are [`AdapterError`]s keep their kind and context.
/// Anything else becomes a generic `AdapterError` naming the adapter, the
/// format and the record type, with the original kept as its source.
pub fn normalize(
    err: anyhow::Error,
    direction: Direction,
    obj_key: &str,
    adapter: &str,
    record_type: &str,
) -> AdapterError {
    match err.downcast::<AdapterError>() {
        Ok(err) => err,
        Err(err) => {
            debug!(
                obj_key,
                adapter,
                record_type,
                error = %err,
                "wrapping opaque adapter failure"
            );
            AdapterError::adapter(format!("Error adapting {direction} {obj_key}"))
                .with("adapter", adapter)
                .with("obj_key", obj_key)
                .with("record_type", record_type)
                .with("original_error", format!("{err:#}"))
                .with_source(err)
        }
    }
}

/// Dump a batch into the neutral data model, tagging failures with the index.
pub(crate) fn dump_all<T: Record>(records: &[T]) -> AdapterResult<Vec<Value>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| encode(record).map_err(|e| e.with("index", index)))
        .collect()
}

/// Enforce the requested shape on adapter output and validate it into `T`.
///
/// Adapters are expected to enforce `many` themselves; this is the last
/// line before a malformed shape would reach the caller.
pub(crate) fn settle<T: Record>(
    output: Records<Value>,
    many: bool,
    obj_key: &str,
) -> AdapterResult<Records<T>> {
    if many {
        return output
            .into_vec()
            .into_iter()
            .enumerate()
            .map(|(index, value)| decode::<T>(value, obj_key).map_err(|e| e.with("index", index)))
            .collect::<AdapterResult<Vec<T>>>()
            .map(Records::Many);
    }

    let value = match output {
        Records::One(value) => value,
        Records::Many(mut values) if values.len() == 1 => values.remove(0),
        Records::Many(values) => {
            return Err(AdapterError::validation(format!(
                "Expected a single record from '{obj_key}', found {}",
                values.len()
            ))
            .with("obj_key", obj_key)
            .with("model_name", T::record_name())
            .with("count", values.len()));
        }
    };
    decode::<T>(value, obj_key).map(Records::One)
}

impl AdapterTable {
    /// Register `adapter` for record type `T`.
    pub fn register_adapter<T: Record>(
        &mut self,
        adapter: impl Adapter + 'static,
    ) -> AdapterResult<()> {
        self.register::<T>(Arc::new(adapter))
    }

    /// Convert one record to the representation named by `obj_key`.
    pub fn adapt_to<T: Record>(
        &self,
        record: &T,
        obj_key: &str,
        options: &Options,
    ) -> AdapterResult<Representation> {
        let adapter = self.get::<T>(obj_key)?;
        debug!(obj_key, record_type = T::record_name(), count = 1, "adapting to");
        let value = encode(record)?;
        run_outward(adapter.as_ref(), Records::One(value), T::record_name(), false, options)
    }

    /// Convert a batch of records; the adapter sees `many = true`.
    pub fn adapt_to_many<T: Record>(
        &self,
        records: &[T],
        obj_key: &str,
        options: &Options,
    ) -> AdapterResult<Representation> {
        let adapter = self.get::<T>(obj_key)?;
        debug!(obj_key, record_type = T::record_name(), count = records.len(), "adapting to");
        let values = dump_all(records)?;
        run_outward(adapter.as_ref(), Records::Many(values), T::record_name(), true, options)
    }

    /// Build records of type `T` from `obj` using the adapter named by `obj_key`.
    pub fn adapt_from<T: Record>(
        &self,
        obj: impl Into<Representation>,
        obj_key: &str,
        many: bool,
        options: &Options,
    ) -> AdapterResult<Records<T>> {
        let adapter = self.get::<T>(obj_key)?;
        debug!(obj_key, record_type = T::record_name(), many, "adapting from");
        let call = Conversion::new(T::record_name(), many, options);
        let output = adapter.inward(obj.into(), &call).map_err(|e| {
            normalize(e, Direction::From, obj_key, adapter.name(), T::record_name())
        })?;
        settle(output, many, obj_key)
    }
}

fn run_outward(
    adapter: &dyn Adapter,
    records: Records<Value>,
    record_type: &str,
    many: bool,
    options: &Options,
) -> AdapterResult<Representation> {
    let call = Conversion::new(record_type, many, options);
    adapter
        .outward(records, &call)
        .map_err(|e| normalize(e, Direction::To, adapter.obj_key(), adapter.name(), record_type))
}
