//! Format settings read from `dapter.toml`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dapter_core::{Adapter, AdapterError, AdapterResult, AdapterTable, Record};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::csv::CsvAdapter;
use crate::json::JsonAdapter;
use crate::toml::TomlAdapter;

/// `[json]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    pub pretty: bool,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// `[csv]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub delimiter: String,
    pub escape: Option<String>,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            escape: None,
        }
    }
}

/// `[toml]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub items_key: String,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            items_key: "items".to_string(),
        }
    }
}

/// Settings for the built-in text formats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub json: JsonConfig,
    pub csv: CsvConfig,
    pub toml: TomlConfig,
}

fn single_byte(setting: &str, value: &str) -> AdapterResult<u8> {
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(AdapterError::configuration(format!(
            "CSV {setting} must be a single ASCII character"
        ))
        .with("setting", setting)
        .with("value", value)),
    }
}

impl FormatConfig {
    pub fn from_toml_str(text: &str) -> AdapterResult<Self> {
        ::toml::from_str(text).map_err(|e: ::toml::de::Error| {
            AdapterError::configuration(format!("Invalid format configuration: {}", e.message()))
                .with_source(e)
        })
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or unusable.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No format config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded format config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("{} in {:?}. Falling back to defaults.", e, path);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read format config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// `dapter.toml` in the current directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from("dapter.toml")
    }

    pub fn csv_adapter(&self) -> AdapterResult<CsvAdapter> {
        let mut adapter =
            CsvAdapter::new().with_delimiter(single_byte("delimiter", &self.csv.delimiter)?);
        if let Some(escape) = &self.csv.escape {
            adapter = adapter.with_escape(single_byte("escape", escape)?);
        }
        Ok(adapter)
    }

    /// The configured json, csv and toml adapters.
    pub fn adapters(&self) -> AdapterResult<Vec<Arc<dyn Adapter>>> {
        let json: Arc<dyn Adapter> = Arc::new(JsonAdapter::with_pretty(self.json.pretty));
        let csv: Arc<dyn Adapter> = Arc::new(self.csv_adapter()?);
        let toml: Arc<dyn Adapter> =
            Arc::new(TomlAdapter::with_items_key(self.toml.items_key.clone()));
        Ok(vec![json, csv, toml])
    }

    /// Register the configured text adapters for record type `T`.
    pub fn register_builtin<T: Record>(&self, table: &mut AdapterTable) -> AdapterResult<()> {
        for adapter in self.adapters()? {
            table.register::<T>(adapter)?;
        }
        Ok(())
    }
}
