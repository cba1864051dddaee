//! In-process document store and the adapters that read and write it.
//!
//! Stands in for a remote document database: collections of JSON objects,
//! equality filters, and a switch to simulate the backend going away.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use dapter_core::{
    Adapter, AdapterError, AdapterResult, AsyncAdapter, Conversion, Options, Records,
    Representation,
};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::value_type;

pub const MEMORY_KEY: &str = "memory";
pub const ASYNC_MEMORY_KEY: &str = "async_memory";

#[derive(Debug, Default)]
struct StoreState {
    collections: BTreeMap<String, Vec<Value>>,
    offline: bool,
}

/// Shared handle to a set of named document collections.
///
/// Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_collection(&self, name: &str) {
        self.write().collections.entry(name.to_string()).or_default();
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.read().collections.keys().cloned().collect()
    }

    /// Document count of `collection`, `None` if it does not exist.
    pub fn len(&self, collection: &str) -> Option<usize> {
        self.read().collections.get(collection).map(Vec::len)
    }

    /// Simulate the backend becoming unreachable (or reachable again).
    pub fn set_offline(&self, offline: bool) {
        self.write().offline = offline;
    }

    fn check_online(state: &StoreState) -> AdapterResult<()> {
        if state.offline {
            return Err(AdapterError::connection("Document store is unreachable")
                .with("adapter", "memory"));
        }
        Ok(())
    }

    fn insert(&self, collection: &str, docs: Vec<Value>, create: bool) -> AdapterResult<usize> {
        let mut state = self.write();
        Self::check_online(&state)?;
        let target = if create {
            state.collections.entry(collection.to_string()).or_default()
        } else {
            state
                .collections
                .get_mut(collection)
                .ok_or_else(|| missing_collection(collection))?
        };
        let count = docs.len();
        target.extend(docs);
        debug!(collection, inserted = count, "documents inserted");
        Ok(count)
    }

    fn find(
        &self,
        collection: &str,
        filter: &Map<String, Value>,
        limit: Option<usize>,
    ) -> AdapterResult<Vec<Value>> {
        let state = self.read();
        Self::check_online(&state)?;
        let docs = state
            .collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;
        let matches = docs.iter().filter(|doc| matches_filter(doc, filter)).cloned();
        Ok(match limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        })
    }

    /// Write records into the collection named by the `collection` option.
    fn save(
        &self,
        records: Records<Value>,
        call: &Conversion<'_>,
    ) -> AdapterResult<Representation> {
        let collection = call.options.require_str("collection")?;
        let create = call.options.get_bool("create_collection").unwrap_or(true);
        let docs = records.into_vec();
        if let Some(bad) = docs.iter().find(|doc| !doc.is_object()) {
            return Err(AdapterError::type_conversion(format!(
                "Documents must be objects, got {}",
                value_type(bad)
            ))
            .with("source_type", value_type(bad))
            .with("model_name", call.record_type));
        }
        let inserted = self.insert(collection, docs, create)?;
        Ok(Representation::Value(json!({
            "collection": collection,
            "inserted_count": inserted,
        })))
    }

    /// Run the query in `obj` and shape the result per `call.many`.
    fn load(&self, obj: Representation, call: &Conversion<'_>) -> AdapterResult<Records<Value>> {
        let query = Query::parse(&obj, call.options)?;
        let mut docs = self.find(&query.collection, &query.filter, query.limit)?;
        if call.many {
            return Ok(Records::Many(docs));
        }
        match docs.len() {
            1 => Ok(Records::One(docs.remove(0))),
            count => Err(AdapterError::validation(format!(
                "Expected exactly one document in '{}', found {count}",
                query.collection
            ))
            .with("collection", query.collection)
            .with("count", count)),
        }
    }
}

fn missing_collection(name: &str) -> AdapterError {
    AdapterError::resource(format!("Collection '{name}' does not exist"))
        .with("resource", name)
}

fn matches_filter(doc: &Value, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(key, expected)| doc.get(key) == Some(expected))
}

/// Structured store query: `{collection, filter?, limit?}`.
struct Query {
    collection: String,
    filter: Map<String, Value>,
    limit: Option<usize>,
}

impl Query {
    fn parse(obj: &Representation, options: &Options) -> AdapterResult<Self> {
        let empty = Map::new();
        let fields = match obj {
            Representation::Value(Value::Object(map)) => map,
            Representation::Value(Value::Null) => &empty,
            other => {
                return Err(AdapterError::validation(
                    "Document store queries must be structured objects",
                )
                .with("representation", other.kind_name()));
            }
        };

        let collection = fields
            .get("collection")
            .and_then(Value::as_str)
            .or_else(|| options.get_str("collection"))
            .ok_or_else(|| {
                AdapterError::validation("Missing required parameter 'collection'")
                    .with("parameter", "collection")
            })?
            .to_string();

        let filter = match fields.get("filter") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(filter)) => filter.clone(),
            Some(other) => {
                return Err(AdapterError::validation("Query filter must be an object")
                    .with("found", value_type(other)));
            }
        };

        let limit = fields
            .get("limit")
            .and_then(Value::as_u64)
            .or_else(|| options.get_u64("limit"))
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX));

        Ok(Self {
            collection,
            filter,
            limit,
        })
    }
}

/// Synchronous document-store adapter (`memory`).
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    store: MemoryStore,
}

impl MemoryAdapter {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

impl Adapter for MemoryAdapter {
    fn obj_key(&self) -> &str {
        MEMORY_KEY
    }

    fn name(&self) -> &str {
        "MemoryAdapter"
    }

    fn outward(
        &self,
        records: Records<Value>,
        call: &Conversion<'_>,
    ) -> anyhow::Result<Representation> {
        Ok(self.store.save(records, call)?)
    }

    fn inward(&self, obj: Representation, call: &Conversion<'_>) -> anyhow::Result<Records<Value>> {
        Ok(self.store.load(obj, call)?)
    }
}

/// Non-blocking document-store adapter (`async_memory`).
#[derive(Debug, Clone)]
pub struct AsyncMemoryAdapter {
    store: MemoryStore,
}

impl AsyncMemoryAdapter {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AsyncAdapter for AsyncMemoryAdapter {
    fn obj_key(&self) -> &str {
        ASYNC_MEMORY_KEY
    }

    fn name(&self) -> &str {
        "AsyncMemoryAdapter"
    }

    async fn outward(
        &self,
        records: Records<Value>,
        call: &Conversion<'_>,
    ) -> anyhow::Result<Representation> {
        tokio::task::yield_now().await;
        Ok(self.store.save(records, call)?)
    }

    async fn inward(
        &self,
        obj: Representation,
        call: &Conversion<'_>,
    ) -> anyhow::Result<Records<Value>> {
        tokio::task::yield_now().await;
        Ok(self.store.load(obj, call)?)
    }
}
