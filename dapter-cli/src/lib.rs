//! Library half of the `dapter` binary.
//!
//! Format conversion goes through an [`AdapterTable`] keyed on [`Document`],
//! a record type that carries any JSON-shaped value. Migration commands go
//! through a [`MigrationRegistry`] holding the file-backed plugin.

use std::path::Path;

use clap::Subcommand;
use dapter_core::{Adaptable, AdapterResult, AdapterTable, Options, Record};
use dapter_formats::FormatConfig;
use dapter_migrations::{BASE, FILE_KEY, FileMigrationAdapter, HEAD, MigrationRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Schema-free record: whatever the source format produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(pub Value);

impl Record for Document {}
impl Adaptable for Document {}

/// Table with the configured text formats registered for [`Document`].
pub fn build_table(config: &FormatConfig) -> AdapterResult<AdapterTable> {
    let mut table = AdapterTable::new();
    config.register_builtin::<Document>(&mut table)?;
    Ok(table)
}

pub fn list_formats(table: &AdapterTable) -> Vec<String> {
    table.keys::<Document>()
}

/// Read `input` as `from` and render it as `to`.
pub fn convert(
    table: &AdapterTable,
    input: &str,
    from: &str,
    to: &str,
    many: bool,
) -> AdapterResult<String> {
    let options = Options::new();
    let rendered = if many {
        let docs = Document::adapt_from_many(table, input, from, &options)?;
        debug!(from, to, count = docs.len(), "converting batch");
        Document::adapt_to_many(&docs, table, to, &options)?
    } else {
        let doc = Document::adapt_from_one(table, input, from, &options)?;
        doc.adapt_to(table, to, &options)?
    };
    rendered.into_text()
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum MigrateAction {
    /// Create the migrations directory
    Init {
        /// Reset an existing directory
        #[arg(long)]
        force: bool,
    },
    /// Add a new revision on top of the chain
    Create {
        /// Revision message
        #[arg(short, long)]
        message: String,

        /// Mark the revision as hand-written
        #[arg(long)]
        no_autogenerate: bool,
    },
    /// Apply revisions up to a target
    Upgrade {
        #[arg(default_value = HEAD)]
        revision: String,
    },
    /// Revert revisions down to a target
    Downgrade { revision: String },
    /// Print the applied revision
    Current,
    /// List revisions, newest first
    History,
}

pub fn migration_registry(dir: &Path) -> AdapterResult<MigrationRegistry> {
    let mut registry = MigrationRegistry::new();
    registry.register(FileMigrationAdapter::new(dir))?;
    Ok(registry)
}

/// Run one migration command against `dir` and return what to print.
pub fn migrate(dir: &Path, action: &MigrateAction) -> AdapterResult<String> {
    let registry = migration_registry(dir)?;
    let options = Options::new();

    match action {
        MigrateAction::Init { force } => {
            let options = options.with("force", *force);
            registry.init_migrations(FILE_KEY, dir, &options)?;
            Ok(format!("Initialized migrations in {}", dir.display()))
        }
        MigrateAction::Create {
            message,
            no_autogenerate,
        } => {
            let revision =
                registry.create_migration(FILE_KEY, message, !no_autogenerate, &options)?;
            Ok(format!("Created revision {revision}"))
        }
        MigrateAction::Upgrade { revision } => {
            registry.upgrade(FILE_KEY, revision, &options)?;
            let current = registry.get_current_revision(FILE_KEY, &options)?;
            Ok(format!("Upgraded to {}", current.as_deref().unwrap_or(BASE)))
        }
        MigrateAction::Downgrade { revision } => {
            registry.downgrade(FILE_KEY, revision, &options)?;
            let current = registry.get_current_revision(FILE_KEY, &options)?;
            Ok(format!("Downgraded to {}", current.as_deref().unwrap_or(BASE)))
        }
        MigrateAction::Current => {
            let current = registry.get_current_revision(FILE_KEY, &options)?;
            Ok(current.unwrap_or_else(|| BASE.to_string()))
        }
        MigrateAction::History => {
            let current = registry.get_current_revision(FILE_KEY, &options)?;
            let history = registry.get_migration_history(FILE_KEY, &options)?;
            let lines: Vec<String> = history
                .iter()
                .enumerate()
                .map(|(i, record)| {
                    let mut line = format!(
                        "{} -> {}",
                        record.down_revision.as_deref().unwrap_or("<base>"),
                        record.revision
                    );
                    if i == 0 {
                        line.push_str(" (head)");
                    }
                    if current.as_deref() == Some(record.revision.as_str()) {
                        line.push_str(" (current)");
                    }
                    line.push_str(", ");
                    line.push_str(&record.message);
                    line
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}
