use crate::adapter::{Adapter, AdapterTable};
use crate::error::AdapterResult;
use crate::options::Options;
use crate::record::Record;
use crate::records::{Records, Representation};

/// Conversion methods on a record type, dispatched through an [`AdapterTable`].
///
/// Opt in with an empty impl. Every method forwards to the table, which owns
/// the registrations; the trait only supplies the call syntax.
///
/// ```
/// use dapter_core::{Adaptable, AdapterTable, Options, Record};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Trade {
///     id: i64,
/// }
///
/// impl Record for Trade {}
/// impl Adaptable for Trade {}
///
/// let table = AdapterTable::new();
/// let err = Trade { id: 1 }
///     .adapt_to(&table, "json", &Options::new())
///     .unwrap_err();
/// assert!(err.to_string().contains("No adapter registered for 'json'"));
/// ```
pub trait Adaptable: Record {
    fn adapt_to(
        &self,
        table: &AdapterTable,
        obj_key: &str,
        options: &Options,
    ) -> AdapterResult<Representation> {
        table.adapt_to(self, obj_key, options)
    }

    fn adapt_to_many(
        records: &[Self],
        table: &AdapterTable,
        obj_key: &str,
        options: &Options,
    ) -> AdapterResult<Representation> {
        table.adapt_to_many(records, obj_key, options)
    }

    fn adapt_from(
        table: &AdapterTable,
        obj: impl Into<Representation>,
        obj_key: &str,
        many: bool,
        options: &Options,
    ) -> AdapterResult<Records<Self>> {
        table.adapt_from::<Self>(obj, obj_key, many, options)
    }

    /// `adapt_from` with `many = false`, unwrapped.
    fn adapt_from_one(
        table: &AdapterTable,
        obj: impl Into<Representation>,
        obj_key: &str,
        options: &Options,
    ) -> AdapterResult<Self> {
        Self::adapt_from(table, obj, obj_key, false, options)?.into_one()
    }

    /// `adapt_from` with `many = true`, unwrapped.
    fn adapt_from_many(
        table: &AdapterTable,
        obj: impl Into<Representation>,
        obj_key: &str,
        options: &Options,
    ) -> AdapterResult<Vec<Self>> {
        Self::adapt_from(table, obj, obj_key, true, options).map(Records::into_vec)
    }

    fn register_adapter(
        table: &mut AdapterTable,
        adapter: impl Adapter + 'static,
    ) -> AdapterResult<()> {
        table.register_adapter::<Self>(adapter)
    }
}
