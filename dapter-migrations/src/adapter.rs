//! Migration plugin contracts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dapter_core::{Options, Registrable, short_type_name};
use serde::{Deserialize, Serialize};

/// Symbolic target: the newest revision.
pub const HEAD: &str = "head";
/// Symbolic target: before the first revision.
pub const BASE: &str = "base";

/// One entry of a migration history, newest first when listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub revision: String,
    pub message: String,
    pub down_revision: Option<String>,
    #[serde(default)]
    pub autogenerate: bool,
    /// Unix seconds.
    pub created_at: Option<i64>,
}

impl MigrationRecord {
    pub fn new(revision: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            message: message.into(),
            down_revision: None,
            autogenerate: false,
            created_at: None,
        }
    }
}

/// A schema-migration tool behind a fixed capability set.
///
/// Implementations raise migration-family [`AdapterError`](dapter_core::AdapterError)s
/// when they can classify a failure; anything else is wrapped by the
/// registry into the kind matching the operation.
pub trait MigrationAdapter: Send + Sync {
    fn migration_key(&self) -> &str;

    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn init_migrations(&self, directory: &Path, options: &Options) -> anyhow::Result<()>;

    /// Create a revision and return its identifier.
    fn create_migration(
        &self,
        message: &str,
        autogenerate: bool,
        options: &Options,
    ) -> anyhow::Result<String>;

    fn upgrade(&self, revision: &str, options: &Options) -> anyhow::Result<()>;

    fn downgrade(&self, revision: &str, options: &Options) -> anyhow::Result<()>;

    fn get_current_revision(&self, options: &Options) -> anyhow::Result<Option<String>>;

    fn get_migration_history(&self, options: &Options) -> anyhow::Result<Vec<MigrationRecord>>;
}

/// Non-blocking counterpart of [`MigrationAdapter`].
#[async_trait]
pub trait AsyncMigrationAdapter: Send + Sync {
    fn migration_key(&self) -> &str;

    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    async fn init_migrations(&self, directory: &Path, options: &Options) -> anyhow::Result<()>;

    async fn create_migration(
        &self,
        message: &str,
        autogenerate: bool,
        options: &Options,
    ) -> anyhow::Result<String>;

    async fn upgrade(&self, revision: &str, options: &Options) -> anyhow::Result<()>;

    async fn downgrade(&self, revision: &str, options: &Options) -> anyhow::Result<()>;

    async fn get_current_revision(&self, options: &Options) -> anyhow::Result<Option<String>>;

    async fn get_migration_history(
        &self,
        options: &Options,
    ) -> anyhow::Result<Vec<MigrationRecord>>;
}

impl Registrable for dyn MigrationAdapter {
    const LABEL: &'static str = "Migration adapter";
    const KEY_NAME: &'static str = "migration_key";

    fn registry_key(&self) -> &str {
        self.migration_key()
    }

    fn plugin_name(&self) -> &str {
        self.name()
    }
}

impl Registrable for dyn AsyncMigrationAdapter {
    const LABEL: &'static str = "Async migration adapter";
    const KEY_NAME: &'static str = "migration_key";

    fn registry_key(&self) -> &str {
        self.migration_key()
    }

    fn plugin_name(&self) -> &str {
        self.name()
    }
}

/// Runs a synchronous migration adapter on tokio's blocking pool so it can
/// be registered with an [`AsyncMigrationRegistry`](crate::AsyncMigrationRegistry).
pub struct Blocking<A> {
    inner: Arc<A>,
}

impl<A: MigrationAdapter + 'static> Blocking<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            inner: Arc::new(adapter),
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    async fn run<R, F>(&self, op: F) -> anyhow::Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&A) -> anyhow::Result<R> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner)).await?
    }
}

#[async_trait]
impl<A: MigrationAdapter + 'static> AsyncMigrationAdapter for Blocking<A> {
    fn migration_key(&self) -> &str {
        self.inner.migration_key()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn init_migrations(&self, directory: &Path, options: &Options) -> anyhow::Result<()> {
        let directory: PathBuf = directory.to_path_buf();
        let options = options.clone();
        self.run(move |a| a.init_migrations(&directory, &options)).await
    }

    async fn create_migration(
        &self,
        message: &str,
        autogenerate: bool,
        options: &Options,
    ) -> anyhow::Result<String> {
        let message = message.to_string();
        let options = options.clone();
        self.run(move |a| a.create_migration(&message, autogenerate, &options))
            .await
    }

    async fn upgrade(&self, revision: &str, options: &Options) -> anyhow::Result<()> {
        let revision = revision.to_string();
        let options = options.clone();
        self.run(move |a| a.upgrade(&revision, &options)).await
    }

    async fn downgrade(&self, revision: &str, options: &Options) -> anyhow::Result<()> {
        let revision = revision.to_string();
        let options = options.clone();
        self.run(move |a| a.downgrade(&revision, &options)).await
    }

    async fn get_current_revision(&self, options: &Options) -> anyhow::Result<Option<String>> {
        let options = options.clone();
        self.run(move |a| a.get_current_revision(&options)).await
    }

    async fn get_migration_history(
        &self,
        options: &Options,
    ) -> anyhow::Result<Vec<MigrationRecord>> {
        let options = options.clone();
        self.run(move |a| a.get_migration_history(&options)).await
    }
}
