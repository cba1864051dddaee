//! Non-blocking dispatch.
//!
//! Registry lookups stay synchronous: the adapter handle is cloned out from
//! under a read lock and the guard is dropped before anything is awaited. A
//! cancelled conversion therefore never holds the lock, and the registry is
//! never left half-updated.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::adapter::AsyncAdapter;
use crate::dispatch::{Direction, dump_all, normalize, settle};
use crate::error::AdapterResult;
use crate::options::Options;
use crate::record::{Record, encode};
use crate::records::{Conversion, Records, Representation};
use crate::registry::{KeyedRegistry, RegistryTable};

/// Per-record-type registries of asynchronous adapters, shareable across
/// tasks.
#[derive(Debug, Default)]
pub struct AsyncAdapterTable {
    inner: RwLock<RegistryTable<dyn AsyncAdapter>>,
}

impl AsyncAdapterTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryTable<dyn AsyncAdapter>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryTable<dyn AsyncAdapter>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register<T: Record>(&self, adapter: Arc<dyn AsyncAdapter>) -> AdapterResult<()> {
        self.write().register::<T>(adapter)
    }

    pub fn register_adapter<T: Record>(
        &self,
        adapter: impl AsyncAdapter + 'static,
    ) -> AdapterResult<()> {
        self.register::<T>(Arc::new(adapter))
    }

    /// See [`RegistryTable::inherit`].
    pub fn inherit<Child: Record, Parent: Record>(&self) -> AdapterResult<()> {
        self.write().inherit::<Child, Parent>()
    }

    pub fn get<T: Record>(&self, obj_key: &str) -> AdapterResult<Arc<dyn AsyncAdapter>> {
        self.read().get::<T>(obj_key)
    }

    pub fn keys<T: Record>(&self) -> Vec<String> {
        self.read().keys::<T>()
    }

    /// Snapshot of the registry `T` resolves through.
    pub fn registry<T: Record>(&self) -> Option<KeyedRegistry<dyn AsyncAdapter>> {
        self.read().registry::<T>().cloned()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub async fn adapt_to<T: Record>(
        &self,
        record: &T,
        obj_key: &str,
        options: &Options,
    ) -> AdapterResult<Representation> {
        let adapter = self.get::<T>(obj_key)?;
        debug!(obj_key, record_type = T::record_name(), count = 1, "adapting to (async)");
        let value = encode(record)?;
        let call = Conversion::new(T::record_name(), false, options);
        adapter
            .outward(Records::One(value), &call)
            .await
            .map_err(|e| normalize(e, Direction::To, obj_key, adapter.name(), T::record_name()))
    }

    pub async fn adapt_to_many<T: Record>(
        &self,
        records: &[T],
        obj_key: &str,
        options: &Options,
    ) -> AdapterResult<Representation> {
        let adapter = self.get::<T>(obj_key)?;
        debug!(
            obj_key,
            record_type = T::record_name(),
            count = records.len(),
            "adapting to (async)"
        );
        let values = dump_all(records)?;
        let call = Conversion::new(T::record_name(), true, options);
        adapter
            .outward(Records::Many(values), &call)
            .await
            .map_err(|e| normalize(e, Direction::To, obj_key, adapter.name(), T::record_name()))
    }

    pub async fn adapt_from<T: Record>(
        &self,
        obj: Representation,
        obj_key: &str,
        many: bool,
        options: &Options,
    ) -> AdapterResult<Records<T>> {
        let adapter = self.get::<T>(obj_key)?;
        debug!(obj_key, record_type = T::record_name(), many, "adapting from (async)");
        let call = Conversion::new(T::record_name(), many, options);
        let output = adapter
            .inward(obj, &call)
            .await
            .map_err(|e| normalize(e, Direction::From, obj_key, adapter.name(), T::record_name()))?;
        settle(output, many, obj_key)
    }
}

/// Async conversion methods on a record type, dispatched through an
/// [`AsyncAdapterTable`].
#[async_trait]
pub trait AsyncAdaptable: Record {
    async fn adapt_to_async(
        &self,
        table: &AsyncAdapterTable,
        obj_key: &str,
        options: &Options,
    ) -> AdapterResult<Representation> {
        table.adapt_to(self, obj_key, options).await
    }

    async fn adapt_to_many_async(
        records: &[Self],
        table: &AsyncAdapterTable,
        obj_key: &str,
        options: &Options,
    ) -> AdapterResult<Representation> {
        table.adapt_to_many(records, obj_key, options).await
    }

    async fn adapt_from_async(
        table: &AsyncAdapterTable,
        obj: Representation,
        obj_key: &str,
        many: bool,
        options: &Options,
    ) -> AdapterResult<Records<Self>> {
        table.adapt_from::<Self>(obj, obj_key, many, options).await
    }

    async fn adapt_from_one_async(
        table: &AsyncAdapterTable,
        obj: Representation,
        obj_key: &str,
        options: &Options,
    ) -> AdapterResult<Self> {
        Self::adapt_from_async(table, obj, obj_key, false, options)
            .await?
            .into_one()
    }

    async fn adapt_from_many_async(
        table: &AsyncAdapterTable,
        obj: Representation,
        obj_key: &str,
        options: &Options,
    ) -> AdapterResult<Vec<Self>> {
        Self::adapt_from_async(table, obj, obj_key, true, options)
            .await
            .map(Records::into_vec)
    }

    fn register_async_adapter(
        table: &AsyncAdapterTable,
        adapter: impl AsyncAdapter + 'static,
    ) -> AdapterResult<()> {
        table.register_adapter::<Self>(adapter)
    }
}
