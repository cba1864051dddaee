//! Plugin contracts for format adapters.

use async_trait::async_trait;
use serde_json::Value;

use crate::record::short_type_name;
use crate::records::{Conversion, Records, Representation};
use crate::registry::{KeyedRegistry, Registrable, RegistryTable};

/// A stateless, synchronous format plugin.
///
/// `outward` turns records (already dumped to the neutral data model) into
/// an external representation; `inward` does the reverse. Neither may keep
/// state between calls. Failures should be raised as
/// [`AdapterError`](crate::AdapterError) when the adapter can classify them;
/// anything else is wrapped by the dispatch layer.
///
/// When `call.many` is false, `inward` must produce exactly one record and
/// raise a `ValidationError` otherwise. When it is true the result is always
/// a sequence, possibly empty.
pub trait Adapter: Send + Sync {
    /// Format identifier this adapter is registered under.
    fn obj_key(&self) -> &str;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn outward(&self, records: Records<Value>, call: &Conversion<'_>)
    -> anyhow::Result<Representation>;

    fn inward(&self, obj: Representation, call: &Conversion<'_>) -> anyhow::Result<Records<Value>>;
}

/// Non-blocking counterpart of [`Adapter`]. Same contract; conversions may
/// suspend while awaiting I/O.
#[async_trait]
pub trait AsyncAdapter: Send + Sync {
    fn obj_key(&self) -> &str;

    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    async fn outward(
        &self,
        records: Records<Value>,
        call: &Conversion<'_>,
    ) -> anyhow::Result<Representation>;

    async fn inward(
        &self,
        obj: Representation,
        call: &Conversion<'_>,
    ) -> anyhow::Result<Records<Value>>;
}

impl Registrable for dyn Adapter {
    const LABEL: &'static str = "Adapter";
    const KEY_NAME: &'static str = "obj_key";

    fn registry_key(&self) -> &str {
        self.obj_key()
    }

    fn plugin_name(&self) -> &str {
        self.name()
    }
}

impl Registrable for dyn AsyncAdapter {
    const LABEL: &'static str = "Async adapter";
    const KEY_NAME: &'static str = "obj_key";

    fn registry_key(&self) -> &str {
        self.obj_key()
    }

    fn plugin_name(&self) -> &str {
        self.name()
    }
}

/// Keyed registry of synchronous format adapters.
pub type AdapterRegistry = KeyedRegistry<dyn Adapter>;

/// Keyed registry of asynchronous format adapters.
pub type AsyncAdapterRegistry = KeyedRegistry<dyn AsyncAdapter>;

/// Per-record-type registries of synchronous format adapters.
pub type AdapterTable = RegistryTable<dyn Adapter>;
