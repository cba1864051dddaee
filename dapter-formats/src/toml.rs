use dapter_core::{
    Adapter, AdapterError, AdapterResult, Conversion, Records, Representation, excerpt,
};
use serde_json::{Map, Number, Value};

use crate::value_type;

pub const TOML_KEY: &str = "toml";

/// TOML text adapter.
///
/// One record is a table. A batch is a single array of tables under
/// `items_key`. TOML has no null, so null fields are dropped on the way out
/// and come back missing.
#[derive(Debug, Clone)]
pub struct TomlAdapter {
    items_key: String,
}

impl TomlAdapter {
    pub fn new() -> Self {
        Self {
            items_key: "items".to_string(),
        }
    }

    pub fn with_items_key(items_key: impl Into<String>) -> Self {
        Self {
            items_key: items_key.into(),
        }
    }

    pub fn items_key(&self) -> &str {
        &self.items_key
    }
}

impl Default for TomlAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop null object members; reject nulls TOML cannot express.
fn strip_nulls(value: Value, path: &str, model: &str) -> AdapterResult<Value> {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, item) in map {
                if item.is_null() {
                    continue;
                }
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                out.insert(key, strip_nulls(item, &child, model)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                if item.is_null() {
                    Err(AdapterError::type_conversion(format!(
                        "TOML arrays cannot hold null (at '{path}[{i}]')"
                    ))
                    .with("field_name", path)
                    .with("source_type", "null")
                    .with("model_name", model))
                } else {
                    strip_nulls(item, &format!("{path}[{i}]"), model)
                }
            })
            .collect::<AdapterResult<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other),
    }
}

fn as_table(value: Value, model: &str) -> AdapterResult<Value> {
    if !value.is_object() {
        return Err(AdapterError::type_conversion(format!(
            "TOML documents must be tables, got {}",
            value_type(&value)
        ))
        .with("source_type", value_type(&value))
        .with("model_name", model));
    }
    strip_nulls(value, "", model)
}

fn to_json(value: toml::Value) -> AdapterResult<Value> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(n) => Value::from(n),
        toml::Value::Float(x) => Number::from_f64(x).map(Value::Number).ok_or_else(|| {
            AdapterError::type_conversion(format!("TOML float {x} has no JSON equivalent"))
                .with("source_type", "float")
        })?,
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(to_json)
                .collect::<AdapterResult<Vec<_>>>()?,
        ),
        toml::Value::Table(table) => table_to_json(table)?,
    })
}

fn table_to_json(table: toml::Table) -> AdapterResult<Value> {
    table
        .into_iter()
        .map(|(k, v)| to_json(v).map(|v| (k, v)))
        .collect::<AdapterResult<Map<_, _>>>()
        .map(Value::Object)
}

impl Adapter for TomlAdapter {
    fn obj_key(&self) -> &str {
        TOML_KEY
    }

    fn name(&self) -> &str {
        "TomlAdapter"
    }

    fn outward(
        &self,
        records: Records<Value>,
        call: &Conversion<'_>,
    ) -> anyhow::Result<Representation> {
        let payload = match records {
            Records::One(value) => as_table(value, call.record_type)?,
            Records::Many(values) => {
                let items = values
                    .into_iter()
                    .map(|v| as_table(v, call.record_type))
                    .collect::<AdapterResult<Vec<_>>>()?;
                let mut wrapper = Map::new();
                wrapper.insert(self.items_key.clone(), Value::Array(items));
                Value::Object(wrapper)
            }
        };
        let text = toml::to_string(&payload).map_err(|e| {
            AdapterError::type_conversion(format!("Cannot express record as TOML: {e}"))
                .with("model_name", call.record_type)
                .with_source(e)
        })?;
        Ok(Representation::Text(text))
    }

    fn inward(&self, obj: Representation, call: &Conversion<'_>) -> anyhow::Result<Records<Value>> {
        let text = obj.as_text()?;
        let table: toml::Table = text.parse().map_err(|e: toml::de::Error| {
            AdapterError::parse(format!("Invalid TOML data: {}", e.message()))
                .with("obj_key", TOML_KEY)
                .with("source", excerpt(&text))
                .with_source(e)
        })?;

        if !call.many {
            return Ok(Records::One(table_to_json(table)?));
        }

        // A lone array entry is the batch; anything else is one record.
        let lone_array = table.len() == 1 && table.values().all(toml::Value::is_array);
        if lone_array {
            if let Some((_, toml::Value::Array(items))) = table.into_iter().next() {
                let rows = items
                    .into_iter()
                    .map(to_json)
                    .collect::<AdapterResult<Vec<_>>>()?;
                return Ok(Records::Many(rows));
            }
            return Ok(Records::Many(Vec::new()));
        }
        Ok(Records::Many(vec![table_to_json(table)?]))
    }
}
