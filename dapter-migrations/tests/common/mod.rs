//! Stub migration adapters for dapter-migrations integration tests.

#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use dapter_core::{AdapterError, Options};
use dapter_migrations::*;
use std::path::Path;
use std::sync::Mutex;

// ── Sync stubs ──────────────────────────────────────────────────

/// Remembers the last revision it was moved to.
#[derive(Debug, Default)]
pub struct StubMigrations {
    pub current: Mutex<Option<String>>,
}

impl MigrationAdapter for StubMigrations {
    fn migration_key(&self) -> &str {
        "test"
    }

    fn init_migrations(&self, _directory: &Path, _options: &Options) -> anyhow::Result<()> {
        Ok(())
    }

    fn create_migration(
        &self,
        _message: &str,
        _autogenerate: bool,
        _options: &Options,
    ) -> anyhow::Result<String> {
        Ok("revision123".to_string())
    }

    fn upgrade(&self, revision: &str, _options: &Options) -> anyhow::Result<()> {
        *self.current.lock().unwrap() = Some(revision.to_string());
        Ok(())
    }

    fn downgrade(&self, revision: &str, _options: &Options) -> anyhow::Result<()> {
        *self.current.lock().unwrap() = Some(revision.to_string());
        Ok(())
    }

    fn get_current_revision(&self, _options: &Options) -> anyhow::Result<Option<String>> {
        Ok(self.current.lock().unwrap().clone())
    }

    fn get_migration_history(&self, _options: &Options) -> anyhow::Result<Vec<MigrationRecord>> {
        Ok(vec![MigrationRecord::new("revision123", "Test migration")])
    }
}

/// Blank key; registration must refuse it.
pub struct Keyless;

impl MigrationAdapter for Keyless {
    fn migration_key(&self) -> &str {
        ""
    }

    fn init_migrations(&self, _directory: &Path, _options: &Options) -> anyhow::Result<()> {
        Ok(())
    }

    fn create_migration(
        &self,
        _message: &str,
        _autogenerate: bool,
        _options: &Options,
    ) -> anyhow::Result<String> {
        Ok(String::new())
    }

    fn upgrade(&self, _revision: &str, _options: &Options) -> anyhow::Result<()> {
        Ok(())
    }

    fn downgrade(&self, _revision: &str, _options: &Options) -> anyhow::Result<()> {
        Ok(())
    }

    fn get_current_revision(&self, _options: &Options) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    fn get_migration_history(&self, _options: &Options) -> anyhow::Result<Vec<MigrationRecord>> {
        Ok(Vec::new())
    }
}

/// Every operation fails with an unclassified error.
pub struct Broken;

impl MigrationAdapter for Broken {
    fn migration_key(&self) -> &str {
        "broken"
    }

    fn init_migrations(&self, _directory: &Path, _options: &Options) -> anyhow::Result<()> {
        Err(anyhow!("database locked"))
    }

    fn create_migration(
        &self,
        _message: &str,
        _autogenerate: bool,
        _options: &Options,
    ) -> anyhow::Result<String> {
        Err(anyhow!("database locked"))
    }

    fn upgrade(&self, _revision: &str, _options: &Options) -> anyhow::Result<()> {
        Err(anyhow!("database locked"))
    }

    fn downgrade(&self, _revision: &str, _options: &Options) -> anyhow::Result<()> {
        Err(anyhow!("database locked"))
    }

    fn get_current_revision(&self, _options: &Options) -> anyhow::Result<Option<String>> {
        Err(anyhow!("database locked"))
    }

    fn get_migration_history(&self, _options: &Options) -> anyhow::Result<Vec<MigrationRecord>> {
        Err(std::io::Error::other("history table missing").into())
    }
}

/// Raises taxonomy errors: migration-family on upgrade, resource elsewhere.
pub struct Classified;

impl MigrationAdapter for Classified {
    fn migration_key(&self) -> &str {
        "classified"
    }

    fn init_migrations(&self, _directory: &Path, _options: &Options) -> anyhow::Result<()> {
        Err(AdapterError::resource("directory is read-only").into())
    }

    fn create_migration(
        &self,
        _message: &str,
        _autogenerate: bool,
        _options: &Options,
    ) -> anyhow::Result<String> {
        Err(AdapterError::migration_creation("revision template missing")
            .with("template", "script.py.mako")
            .into())
    }

    fn upgrade(&self, revision: &str, _options: &Options) -> anyhow::Result<()> {
        Err(AdapterError::migration_not_found(format!("Revision '{revision}' not found"))
            .with("revision", revision)
            .into())
    }

    fn downgrade(&self, _revision: &str, _options: &Options) -> anyhow::Result<()> {
        Err(AdapterError::resource("lock held").into())
    }

    fn get_current_revision(&self, _options: &Options) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    fn get_migration_history(&self, _options: &Options) -> anyhow::Result<Vec<MigrationRecord>> {
        Ok(Vec::new())
    }
}

// ── Async stubs ─────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct AsyncStub {
    pub current: Mutex<Option<String>>,
}

#[async_trait]
impl AsyncMigrationAdapter for AsyncStub {
    fn migration_key(&self) -> &str {
        "async_test"
    }

    async fn init_migrations(&self, _directory: &Path, _options: &Options) -> anyhow::Result<()> {
        Ok(())
    }

    async fn create_migration(
        &self,
        _message: &str,
        _autogenerate: bool,
        _options: &Options,
    ) -> anyhow::Result<String> {
        tokio::task::yield_now().await;
        Ok("async_revision".to_string())
    }

    async fn upgrade(&self, revision: &str, _options: &Options) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        *self.current.lock().unwrap() = Some(revision.to_string());
        Ok(())
    }

    async fn downgrade(&self, revision: &str, _options: &Options) -> anyhow::Result<()> {
        *self.current.lock().unwrap() = Some(revision.to_string());
        Ok(())
    }

    async fn get_current_revision(&self, _options: &Options) -> anyhow::Result<Option<String>> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn get_migration_history(
        &self,
        _options: &Options,
    ) -> anyhow::Result<Vec<MigrationRecord>> {
        Ok(vec![MigrationRecord::new("async_revision", "Async migration")])
    }
}

pub struct AsyncBroken;

#[async_trait]
impl AsyncMigrationAdapter for AsyncBroken {
    fn migration_key(&self) -> &str {
        "async_broken"
    }

    async fn init_migrations(&self, _directory: &Path, _options: &Options) -> anyhow::Result<()> {
        Err(anyhow!("connection reset"))
    }

    async fn create_migration(
        &self,
        _message: &str,
        _autogenerate: bool,
        _options: &Options,
    ) -> anyhow::Result<String> {
        Err(anyhow!("connection reset"))
    }

    async fn upgrade(&self, _revision: &str, _options: &Options) -> anyhow::Result<()> {
        Err(anyhow!("connection reset"))
    }

    async fn downgrade(&self, _revision: &str, _options: &Options) -> anyhow::Result<()> {
        Err(AdapterError::migration_downgrade("no down step").into())
    }

    async fn get_current_revision(&self, _options: &Options) -> anyhow::Result<Option<String>> {
        Err(anyhow!("connection reset"))
    }

    async fn get_migration_history(
        &self,
        _options: &Options,
    ) -> anyhow::Result<Vec<MigrationRecord>> {
        Err(anyhow!("connection reset"))
    }
}

pub fn opts() -> Options {
    Options::new()
}
