//! Shared record types and stub adapters for dapter-core integration tests.

#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use dapter_core::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

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
            name: format!("item-{i}"),
            value: i as f64 * 1.5,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Other {
    pub label: String,
}

impl Record for Other {}
impl Adaptable for Other {}

/// Derived record type used for inheritance tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Special {
    pub id: i64,
    pub name: String,
    pub value: f64,
}

impl Record for Special {}
impl Adaptable for Special {}

// ── Stub adapters ───────────────────────────────────────────────

/// Minimal JSON adapter: one object or an array of objects.
pub struct StubJson;

impl Adapter for StubJson {
    fn obj_key(&self) -> &str {
        "json"
    }

    fn outward(&self, records: Records<Value>, _call: &Conversion<'_>) -> anyhow::Result<Representation> {
        let value = match records {
            Records::One(v) => v,
            Records::Many(vs) => Value::Array(vs),
        };
        Ok(Representation::Text(serde_json::to_string(&value)?))
    }

    fn inward(&self, obj: Representation, call: &Conversion<'_>) -> anyhow::Result<Records<Value>> {
        let value: Value = serde_json::from_str(&obj.as_text()?)?;
        match (value, call.many) {
            (Value::Array(items), true) => Ok(Records::Many(items)),
            (Value::Array(items), false) => Ok(Records::One(Records::Many(items).into_one()?)),
            (other, true) => Ok(Records::Many(vec![other])),
            (other, false) => Ok(Records::One(other)),
        }
    }
}

/// Adapter that tags its output so tests can tell registrations apart.
pub struct Tagged {
    pub key: &'static str,
    pub tag: &'static str,
}

impl Adapter for Tagged {
    fn obj_key(&self) -> &str {
        self.key
    }

    fn outward(&self, _records: Records<Value>, _call: &Conversion<'_>) -> anyhow::Result<Representation> {
        Ok(Representation::Text(self.tag.to_owned()))
    }

    fn inward(&self, _obj: Representation, _call: &Conversion<'_>) -> anyhow::Result<Records<Value>> {
        Ok(Records::One(serde_json::json!({"id": 0, "name": self.tag, "value": 0.0})))
    }
}

/// Adapter with a blank format identifier.
pub struct Keyless;

impl Adapter for Keyless {
    fn obj_key(&self) -> &str {
        "  "
    }

    fn outward(&self, _records: Records<Value>, _call: &Conversion<'_>) -> anyhow::Result<Representation> {
        Ok(Representation::Text(String::new()))
    }

    fn inward(&self, _obj: Representation, _call: &Conversion<'_>) -> anyhow::Result<Records<Value>> {
        Ok(Records::Many(Vec::new()))
    }
}

/// Adapter that fails with an error outside the taxonomy.
pub struct Opaque;

impl Adapter for Opaque {
    fn obj_key(&self) -> &str {
        "opaque"
    }

    fn outward(&self, _records: Records<Value>, _call: &Conversion<'_>) -> anyhow::Result<Representation> {
        Err(anyhow!("disk on fire"))
    }

    fn inward(&self, _obj: Representation, _call: &Conversion<'_>) -> anyhow::Result<Records<Value>> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed").into())
    }
}

/// Adapter that raises taxonomy errors directly.
pub struct Strict;

impl Adapter for Strict {
    fn obj_key(&self) -> &str {
        "strict"
    }

    fn outward(&self, _records: Records<Value>, _call: &Conversion<'_>) -> anyhow::Result<Representation> {
        Err(AdapterError::connection("Backend unreachable")
            .with("url", "mem://nowhere")
            .into())
    }

    fn inward(&self, _obj: Representation, _call: &Conversion<'_>) -> anyhow::Result<Records<Value>> {
        Err(AdapterError::parse("Bad syntax").with("line", 3).into())
    }
}

/// Adapter that ignores `many` and always returns `count` records.
pub struct Sloppy {
    pub count: usize,
}

impl Adapter for Sloppy {
    fn obj_key(&self) -> &str {
        "sloppy"
    }

    fn outward(&self, records: Records<Value>, _call: &Conversion<'_>) -> anyhow::Result<Representation> {
        Ok(Representation::Text(records.len().to_string()))
    }

    fn inward(&self, _obj: Representation, _call: &Conversion<'_>) -> anyhow::Result<Records<Value>> {
        let rows = samples(self.count as i64)
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Records::Many(rows))
    }
}

/// Adapter that returns structurally invalid records.
pub struct Malformed;

impl Adapter for Malformed {
    fn obj_key(&self) -> &str {
        "malformed"
    }

    fn outward(&self, _records: Records<Value>, _call: &Conversion<'_>) -> anyhow::Result<Representation> {
        Ok(Representation::Text(String::new()))
    }

    fn inward(&self, _obj: Representation, call: &Conversion<'_>) -> anyhow::Result<Records<Value>> {
        let good = serde_json::json!({"id": 1, "name": "ok", "value": 1.0});
        let bad = serde_json::json!({"id": 2, "value": 2.0});
        if call.many {
            Ok(Records::Many(vec![good, bad]))
        } else {
            Ok(Records::One(bad))
        }
    }
}

// ── Async stubs ─────────────────────────────────────────────────

/// Async JSON adapter that sleeps before converting.
pub struct SlowJson {
    pub delay: Duration,
}

#[async_trait]
impl AsyncAdapter for SlowJson {
    fn obj_key(&self) -> &str {
        "slow_json"
    }

    async fn outward(
        &self,
        records: Records<Value>,
        call: &Conversion<'_>,
    ) -> anyhow::Result<Representation> {
        tokio::time::sleep(self.delay).await;
        StubJson.outward(records, call)
    }

    async fn inward(
        &self,
        obj: Representation,
        call: &Conversion<'_>,
    ) -> anyhow::Result<Records<Value>> {
        tokio::time::sleep(self.delay).await;
        StubJson.inward(obj, call)
    }
}

/// Async adapter whose failure surfaces only after suspending.
pub struct LateFailure;

#[async_trait]
impl AsyncAdapter for LateFailure {
    fn obj_key(&self) -> &str {
        "late"
    }

    async fn outward(
        &self,
        _records: Records<Value>,
        _call: &Conversion<'_>,
    ) -> anyhow::Result<Representation> {
        tokio::task::yield_now().await;
        Err(anyhow!("socket reset"))
    }

    async fn inward(
        &self,
        _obj: Representation,
        _call: &Conversion<'_>,
    ) -> anyhow::Result<Records<Value>> {
        tokio::task::yield_now().await;
        Err(AdapterError::resource("Collection 'ghosts' does not exist")
            .with("resource", "ghosts")
            .into())
    }
}
