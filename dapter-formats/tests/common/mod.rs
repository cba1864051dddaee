//! Record types shared by the format adapter tests.

#![allow(dead_code)]

use dapter_core::{Adaptable, AdapterTable, AsyncAdaptable, AsyncAdapterTable, Record};
use dapter_formats::{AsyncMemoryAdapter, FormatConfig, MemoryAdapter, MemoryStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: i64,
    pub name: String,
    pub value: f64,
}

impl Record for Sample {}
impl Adaptable for Sample {}
impl AsyncAdaptable for Sample {}

pub fn sample() -> Sample {
    Sample {
        id: 1,
        name: "foo".into(),
        value: 42.5,
    }
}

pub fn samples(n: i64) -> Vec<Sample> {
    (0..n)
        .map(|i| Sample {
            id: i,
            name: format!("item {i}"),
            value: i as f64 + 0.25,
        })
        .collect()
}

/// Record with an optional field and a nested list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub email: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Record for Contact {}
impl Adaptable for Contact {}

/// A table with the default json, csv and toml adapters registered for
/// `Sample` and `Contact`.
pub fn text_table() -> AdapterTable {
    let config = FormatConfig::default();
    let mut table = AdapterTable::new();
    config.register_builtin::<Sample>(&mut table).unwrap();
    config.register_builtin::<Contact>(&mut table).unwrap();
    table
}

pub fn memory_table(store: &MemoryStore) -> AdapterTable {
    let mut table = AdapterTable::new();
    Sample::register_adapter(&mut table, MemoryAdapter::new(store.clone())).unwrap();
    table
}

pub fn async_memory_table(store: &MemoryStore) -> AsyncAdapterTable {
    let table = AsyncAdapterTable::new();
    Sample::register_async_adapter(&table, AsyncMemoryAdapter::new(store.clone())).unwrap();
    table
}
