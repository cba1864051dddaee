//! Migration registries and their forwarding operations.
//!
//! Lookup failures surface as `AdapterNotFoundError` untouched. Failures
//! from the plugin itself keep their kind when they already belong to the
//! migration family; anything else becomes the migration kind matching the
//! operation, with the original kept as source.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dapter_core::{AdapterError, AdapterResult, ErrorKind, KeyedRegistry, Options};
use tracing::{debug, info};

use crate::adapter::{AsyncMigrationAdapter, MigrationAdapter, MigrationRecord};

#[derive(Debug, Clone, Copy)]
enum Operation<'a> {
    Init { directory: &'a Path },
    Create { message: &'a str, autogenerate: bool },
    Upgrade { revision: &'a str },
    Downgrade { revision: &'a str },
    Current,
    History,
}

impl Operation<'_> {
    fn label(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init_migrations",
            Self::Create { .. } => "create_migration",
            Self::Upgrade { .. } => "upgrade",
            Self::Downgrade { .. } => "downgrade",
            Self::Current => "get_current_revision",
            Self::History => "get_migration_history",
        }
    }

    fn failure(&self, key: &str, adapter: &str, is_async: bool) -> AdapterError {
        let flavor = if is_async { "async " } else { "" };
        match *self {
            Self::Init { directory } => AdapterError::migration_init(format!(
                "Failed to initialize {flavor}migrations for '{key}'"
            ))
            .with("directory", directory.display().to_string())
            .with("adapter", adapter),
            Self::Create {
                message,
                autogenerate,
            } => AdapterError::migration_creation(format!(
                "Failed to create {flavor}migration for '{key}'"
            ))
            .with("message_text", message)
            .with("autogenerate", autogenerate)
            .with("adapter", adapter),
            Self::Upgrade { revision } => AdapterError::migration_upgrade(format!(
                "Failed to upgrade {flavor}migrations for '{key}'"
            ))
            .with("revision", revision)
            .with("adapter", adapter),
            Self::Downgrade { revision } => AdapterError::migration_downgrade(format!(
                "Failed to downgrade {flavor}migrations for '{key}'"
            ))
            .with("revision", revision)
            .with("adapter", adapter),
            Self::Current => AdapterError::migration(format!(
                "Failed to get current {flavor}revision for '{key}'"
            ))
            .with("adapter", adapter),
            Self::History => AdapterError::migration(format!(
                "Failed to get {flavor}migration history for '{key}'"
            ))
            .with("adapter", adapter),
        }
    }

    fn wrap(&self, err: anyhow::Error, key: &str, adapter: &str, is_async: bool) -> AdapterError {
        let err = match err.downcast::<AdapterError>() {
            Ok(err) if err.is(ErrorKind::Migration) => return err,
            Ok(err) => anyhow::Error::new(err),
            Err(err) => err,
        };
        debug!(
            migration_key = key,
            adapter,
            operation = self.label(),
            error = %err,
            "wrapping migration failure"
        );
        self.failure(key, adapter, is_async)
            .with("original_error", format!("{err:#}"))
            .with_source(err)
    }
}

/// Registry of synchronous migration adapters keyed by `migration_key`.
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    adapters: KeyedRegistry<dyn MigrationAdapter>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: impl MigrationAdapter + 'static) -> AdapterResult<()> {
        self.adapters.register(Arc::new(adapter))
    }

    pub fn get(&self, migration_key: &str) -> AdapterResult<Arc<dyn MigrationAdapter>> {
        self.adapters.get(migration_key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.adapters.keys()
    }

    pub fn contains(&self, migration_key: &str) -> bool {
        self.adapters.contains(migration_key)
    }

    fn call<R>(
        &self,
        key: &str,
        op: Operation<'_>,
        run: impl FnOnce(&dyn MigrationAdapter) -> anyhow::Result<R>,
    ) -> AdapterResult<R> {
        let adapter = self.get(key)?;
        run(adapter.as_ref()).map_err(|e| op.wrap(e, key, adapter.name(), false))
    }

    pub fn init_migrations(
        &self,
        migration_key: &str,
        directory: &Path,
        options: &Options,
    ) -> AdapterResult<()> {
        self.call(migration_key, Operation::Init { directory }, |a| {
            a.init_migrations(directory, options)
        })?;
        info!(migration_key, directory = %directory.display(), "migrations initialized");
        Ok(())
    }

    pub fn create_migration(
        &self,
        migration_key: &str,
        message: &str,
        autogenerate: bool,
        options: &Options,
    ) -> AdapterResult<String> {
        let op = Operation::Create {
            message,
            autogenerate,
        };
        let revision = self.call(migration_key, op, |a| {
            a.create_migration(message, autogenerate, options)
        })?;
        info!(migration_key, revision = %revision, message, "migration created");
        Ok(revision)
    }

    pub fn upgrade(
        &self,
        migration_key: &str,
        revision: &str,
        options: &Options,
    ) -> AdapterResult<()> {
        self.call(migration_key, Operation::Upgrade { revision }, |a| {
            a.upgrade(revision, options)
        })?;
        info!(migration_key, revision, "migrations upgraded");
        Ok(())
    }

    pub fn downgrade(
        &self,
        migration_key: &str,
        revision: &str,
        options: &Options,
    ) -> AdapterResult<()> {
        self.call(migration_key, Operation::Downgrade { revision }, |a| {
            a.downgrade(revision, options)
        })?;
        info!(migration_key, revision, "migrations downgraded");
        Ok(())
    }

    pub fn get_current_revision(
        &self,
        migration_key: &str,
        options: &Options,
    ) -> AdapterResult<Option<String>> {
        self.call(migration_key, Operation::Current, |a| a.get_current_revision(options))
    }

    pub fn get_migration_history(
        &self,
        migration_key: &str,
        options: &Options,
    ) -> AdapterResult<Vec<MigrationRecord>> {
        self.call(migration_key, Operation::History, |a| a.get_migration_history(options))
    }
}

/// Registry of asynchronous migration adapters, shareable across tasks.
#[derive(Debug, Default)]
pub struct AsyncMigrationRegistry {
    adapters: RwLock<KeyedRegistry<dyn AsyncMigrationAdapter>>,
}

impl AsyncMigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, KeyedRegistry<dyn AsyncMigrationAdapter>> {
        self.adapters.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, KeyedRegistry<dyn AsyncMigrationAdapter>> {
        self.adapters.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, adapter: impl AsyncMigrationAdapter + 'static) -> AdapterResult<()> {
        self.write().register(Arc::new(adapter))
    }

    pub fn get(&self, migration_key: &str) -> AdapterResult<Arc<dyn AsyncMigrationAdapter>> {
        self.read().get(migration_key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.read().keys()
    }

    pub async fn init_migrations(
        &self,
        migration_key: &str,
        directory: &Path,
        options: &Options,
    ) -> AdapterResult<()> {
        let adapter = self.get(migration_key)?;
        adapter
            .init_migrations(directory, options)
            .await
            .map_err(|e| {
                Operation::Init { directory }.wrap(e, migration_key, adapter.name(), true)
            })?;
        info!(migration_key, directory = %directory.display(), "migrations initialized");
        Ok(())
    }

    pub async fn create_migration(
        &self,
        migration_key: &str,
        message: &str,
        autogenerate: bool,
        options: &Options,
    ) -> AdapterResult<String> {
        let adapter = self.get(migration_key)?;
        let op = Operation::Create {
            message,
            autogenerate,
        };
        let revision = adapter
            .create_migration(message, autogenerate, options)
            .await
            .map_err(|e| op.wrap(e, migration_key, adapter.name(), true))?;
        info!(migration_key, revision = %revision, message, "migration created");
        Ok(revision)
    }

    pub async fn upgrade(
        &self,
        migration_key: &str,
        revision: &str,
        options: &Options,
    ) -> AdapterResult<()> {
        let adapter = self.get(migration_key)?;
        adapter
            .upgrade(revision, options)
            .await
            .map_err(|e| {
                Operation::Upgrade { revision }.wrap(e, migration_key, adapter.name(), true)
            })?;
        info!(migration_key, revision, "migrations upgraded");
        Ok(())
    }

    pub async fn downgrade(
        &self,
        migration_key: &str,
        revision: &str,
        options: &Options,
    ) -> AdapterResult<()> {
        let adapter = self.get(migration_key)?;
        adapter
            .downgrade(revision, options)
            .await
            .map_err(|e| {
                Operation::Downgrade { revision }.wrap(e, migration_key, adapter.name(), true)
            })?;
        info!(migration_key, revision, "migrations downgraded");
        Ok(())
    }

    pub async fn get_current_revision(
        &self,
        migration_key: &str,
        options: &Options,
    ) -> AdapterResult<Option<String>> {
        let adapter = self.get(migration_key)?;
        adapter
            .get_current_revision(options)
            .await
            .map_err(|e| Operation::Current.wrap(e, migration_key, adapter.name(), true))
    }

    pub async fn get_migration_history(
        &self,
        migration_key: &str,
        options: &Options,
    ) -> AdapterResult<Vec<MigrationRecord>> {
        let adapter = self.get(migration_key)?;
        adapter
            .get_migration_history(options)
            .await
            .map_err(|e| Operation::History.wrap(e, migration_key, adapter.name(), true))
    }
}
