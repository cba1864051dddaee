use dapter_core::{Adapter, AdapterError, Conversion, Records, Representation, excerpt};
use serde_json::Value;

pub const JSON_KEY: &str = "json";

/// JSON text adapter.
///
/// Outward renders one object, or an array of objects for a batch, with
/// keys sorted. Inward also accepts an already-parsed value.
#[derive(Debug, Clone)]
pub struct JsonAdapter {
    pretty: bool,
}

impl JsonAdapter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Compact output unless the call asks for `pretty = true`.
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn with_pretty(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl Default for JsonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn parse(text: &str) -> Result<Value, AdapterError> {
    serde_json::from_str(text).map_err(|e| {
        AdapterError::parse(format!("Invalid JSON data: {e}"))
            .with("obj_key", JSON_KEY)
            .with("line", e.line())
            .with("column", e.column())
            .with("source", excerpt(text))
            .with_source(e)
    })
}

impl Adapter for JsonAdapter {
    fn obj_key(&self) -> &str {
        JSON_KEY
    }

    fn name(&self) -> &str {
        "JsonAdapter"
    }

    fn outward(
        &self,
        records: Records<Value>,
        call: &Conversion<'_>,
    ) -> anyhow::Result<Representation> {
        let payload = match records {
            Records::One(value) => value,
            Records::Many(values) => Value::Array(values),
        };
        let pretty = call.options.get_bool("pretty").unwrap_or(self.pretty);
        let text = if pretty {
            serde_json::to_string_pretty(&payload)?
        } else {
            serde_json::to_string(&payload)?
        };
        Ok(Representation::Text(text))
    }

    fn inward(&self, obj: Representation, call: &Conversion<'_>) -> anyhow::Result<Records<Value>> {
        let data = match obj {
            Representation::Value(value) if !value.is_string() => value,
            other => parse(&other.as_text()?)?,
        };

        match (data, call.many) {
            (Value::Array(items), true) => Ok(Records::Many(items)),
            (other, true) => Err(AdapterError::validation(
                "Expected a JSON array when reading many records",
            )
            .with("obj_key", JSON_KEY)
            .with("found", crate::value_type(&other))
            .into()),
            (Value::Array(mut items), false) => {
                if items.len() == 1 {
                    Ok(Records::One(items.remove(0)))
                } else {
                    Err(AdapterError::validation(format!(
                        "Expected a single JSON record, found an array of {}",
                        items.len()
                    ))
                    .with("obj_key", JSON_KEY)
                    .with("count", items.len())
                    .into())
                }
            }
            (other, false) => Ok(Records::One(other)),
        }
    }
}
