//! File-backed migration plugin.
//!
//! Layout under the migrations directory:
//!
//! ```text
//! migrations.json        current revision and the ordered revision chain
//! versions/<rev>.json    one MigrationRecord per revision
//! ```
//!
//! Revisions form a single linear chain. Targets are `head`, `base`, an
//! exact revision id (or a unique prefix of one), or a relative step `+N` /
//! `-N` from the current revision.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use dapter_core::{AdapterError, AdapterResult, Options};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::adapter::{BASE, HEAD, MigrationAdapter, MigrationRecord};

pub const FILE_KEY: &str = "file";

const STATE_FILE: &str = "migrations.json";
const VERSIONS_DIR: &str = "versions";
const REVISION_LEN: usize = 12;

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    current: Option<String>,
    /// Oldest first.
    #[serde(default)]
    revisions: Vec<String>,
}

impl State {
    /// Position in the chain: 0 is base, `n` means `revisions[n - 1]` is applied.
    fn level(&self) -> usize {
        self.current
            .as_ref()
            .and_then(|rev| self.revisions.iter().position(|r| r == rev))
            .map_or(0, |idx| idx + 1)
    }

    fn revision_at(&self, level: usize) -> Option<String> {
        level.checked_sub(1).map(|idx| self.revisions[idx].clone())
    }

    fn resolve(&self, target: &str) -> AdapterResult<usize> {
        let head = self.revisions.len();
        let current = self.level();
        let not_found = |reason: &str| {
            AdapterError::migration_not_found(format!("Revision '{target}' not found: {reason}"))
                .with("revision", target)
                .with("adapter", FILE_KEY)
        };

        if target == HEAD {
            return Ok(head);
        }
        if target == BASE {
            return Ok(0);
        }
        if let Some(steps) = target.strip_prefix('+') {
            let steps: usize = steps.parse().map_err(|_| not_found("bad relative step"))?;
            return current
                .checked_add(steps)
                .filter(|level| *level <= head)
                .ok_or_else(|| not_found("beyond head"));
        }
        if let Some(steps) = target.strip_prefix('-') {
            let steps: usize = steps.parse().map_err(|_| not_found("bad relative step"))?;
            return current
                .checked_sub(steps)
                .ok_or_else(|| not_found("before base"));
        }

        if let Some(idx) = self.revisions.iter().position(|r| r == target) {
            return Ok(idx + 1);
        }
        let mut prefixed = self
            .revisions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.starts_with(target));
        match (prefixed.next(), prefixed.next()) {
            (Some((idx, _)), None) if !target.is_empty() => Ok(idx + 1),
            (Some(_), Some(_)) => Err(not_found("ambiguous prefix")),
            _ => Err(not_found("unknown revision")),
        }
    }
}

/// Migration plugin that keeps revision state in plain JSON files.
#[derive(Debug, Clone, Default)]
pub struct FileMigrationAdapter {
    directory: Option<PathBuf>,
}

impl FileMigrationAdapter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
        }
    }

    /// An adapter with no default directory; every call must pass the
    /// `directory` option.
    pub fn unbound() -> Self {
        Self::default()
    }

    fn directory(&self, options: &Options) -> AdapterResult<PathBuf> {
        options
            .get_str("directory")
            .map(PathBuf::from)
            .or_else(|| self.directory.clone())
            .ok_or_else(|| {
                AdapterError::validation("Missing required parameter 'directory'")
                    .with("parameter", "directory")
            })
    }

    fn load(dir: &Path) -> AdapterResult<State> {
        let path = dir.join(STATE_FILE);
        if !path.exists() {
            return Err(AdapterError::resource(format!(
                "Migrations are not initialized in '{}'",
                dir.display()
            ))
            .with("directory", dir.display().to_string()));
        }
        let text = fs::read_to_string(&path).map_err(|e| io_failure("read", &path, e))?;
        serde_json::from_str(&text).map_err(|e| {
            AdapterError::parse(format!("Corrupt migration state: {e}"))
                .with("path", path.display().to_string())
                .with_source(e)
        })
    }

    fn save(dir: &Path, state: &State) -> AdapterResult<()> {
        let path = dir.join(STATE_FILE);
        let staging = dir.join(format!("{STATE_FILE}.tmp"));
        let text = serde_json::to_string_pretty(state)?;
        fs::write(&staging, text).map_err(|e| io_failure("write", &staging, e))?;
        fs::rename(&staging, &path).map_err(|e| io_failure("replace", &path, e))
    }

    fn version_path(dir: &Path, revision: &str) -> PathBuf {
        dir.join(VERSIONS_DIR).join(format!("{revision}.json"))
    }

    fn read_record(dir: &Path, revision: &str) -> AdapterResult<MigrationRecord> {
        let path = Self::version_path(dir, revision);
        let text = fs::read_to_string(&path).map_err(|e| io_failure("read", &path, e))?;
        let record = serde_json::from_str(&text)?;
        Ok(record)
    }

    fn transition(&self, target: &str, options: &Options, forward: bool) -> AdapterResult<()> {
        let dir = self.directory(options)?;
        let mut state = Self::load(&dir)?;
        let from = state.level();
        let to = state.resolve(target)?;

        if (forward && to < from) || (!forward && to > from) {
            let err = if forward {
                AdapterError::migration_upgrade(format!(
                    "Cannot upgrade to '{target}': it is behind the current revision"
                ))
            } else {
                AdapterError::migration_downgrade(format!(
                    "Cannot downgrade to '{target}': it is ahead of the current revision"
                ))
            };
            return Err(err
                .with("revision", target)
                .with("current", state.current.clone())
                .with("adapter", FILE_KEY));
        }
        if to == from {
            debug!(directory = %dir.display(), target, "already at target revision");
            return Ok(());
        }

        let steps: Vec<usize> = if forward {
            (from + 1..=to).collect()
        } else {
            (to + 1..=from).rev().collect()
        };
        let direction = if forward { "up" } else { "down" };
        for level in steps {
            debug!(revision = %state.revisions[level - 1], direction, "applying revision");
        }
        state.current = state.revision_at(to);
        Self::save(&dir, &state)?;
        info!(
            directory = %dir.display(),
            current = state.current.as_deref().unwrap_or(BASE),
            "migration state changed"
        );
        Ok(())
    }
}

fn io_failure(action: &str, path: &Path, e: std::io::Error) -> AdapterError {
    AdapterError::resource(format!("Failed to {action} '{}': {e}", path.display()))
        .with("path", path.display().to_string())
        .with_source(e)
}

fn new_revision() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(REVISION_LEN);
    id
}

impl MigrationAdapter for FileMigrationAdapter {
    fn migration_key(&self) -> &str {
        FILE_KEY
    }

    fn name(&self) -> &str {
        "FileMigrationAdapter"
    }

    fn init_migrations(&self, directory: &Path, options: &Options) -> anyhow::Result<()> {
        // Every later call reads the configured directory, so init must write there.
        if let Ok(configured) = self.directory(options) {
            if configured != directory {
                return Err(AdapterError::migration_init(format!(
                    "Cannot initialize '{}': the adapter works on '{}'",
                    directory.display(),
                    configured.display()
                ))
                .with("directory", directory.display().to_string())
                .with("configured", configured.display().to_string())
                .with("adapter", FILE_KEY)
                .into());
            }
        }
        let force = options.get_bool("force").unwrap_or(false);
        let versions = directory.join(VERSIONS_DIR);

        if directory.join(STATE_FILE).exists() {
            if !force {
                return Err(AdapterError::migration_init(format!(
                    "Migrations already initialized in '{}'",
                    directory.display()
                ))
                .with("directory", directory.display().to_string())
                .with("adapter", FILE_KEY)
                .into());
            }
            if versions.exists() {
                fs::remove_dir_all(&versions).map_err(|e| io_failure("clear", &versions, e))?;
            }
        }

        fs::create_dir_all(&versions).map_err(|e| io_failure("create", &versions, e))?;
        Self::save(directory, &State::default())?;
        Ok(())
    }

    fn create_migration(
        &self,
        message: &str,
        autogenerate: bool,
        options: &Options,
    ) -> anyhow::Result<String> {
        if message.trim().is_empty() {
            return Err(AdapterError::validation("Migration message must not be empty")
                .with("message_text", message)
                .into());
        }
        let dir = self.directory(options)?;
        let mut state = Self::load(&dir)?;

        let revision = new_revision();
        let record = MigrationRecord {
            revision: revision.clone(),
            message: message.to_string(),
            down_revision: state.revisions.last().cloned(),
            autogenerate,
            created_at: Some(Utc::now().timestamp()),
        };
        let path = Self::version_path(&dir, &revision);
        let text = serde_json::to_string_pretty(&record)?;
        fs::write(&path, text).map_err(|e| io_failure("write", &path, e))?;

        state.revisions.push(revision.clone());
        if let Err(e) = Self::save(&dir, &state) {
            // Not in the chain, so it must not linger on disk.
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }
        Ok(revision)
    }

    fn upgrade(&self, revision: &str, options: &Options) -> anyhow::Result<()> {
        Ok(self.transition(revision, options, true)?)
    }

    fn downgrade(&self, revision: &str, options: &Options) -> anyhow::Result<()> {
        Ok(self.transition(revision, options, false)?)
    }

    fn get_current_revision(&self, options: &Options) -> anyhow::Result<Option<String>> {
        let dir = self.directory(options)?;
        Ok(Self::load(&dir)?.current)
    }

    fn get_migration_history(&self, options: &Options) -> anyhow::Result<Vec<MigrationRecord>> {
        let dir = self.directory(options)?;
        let state = Self::load(&dir)?;
        let history = state
            .revisions
            .iter()
            .rev()
            .map(|rev| Self::read_record(&dir, rev))
            .collect::<AdapterResult<Vec<_>>>()?;
        Ok(history)
    }
}
