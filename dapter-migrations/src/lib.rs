//! Schema migration plugins for dapter.
//!
//! A [`MigrationRegistry`] maps `migration_key` identifiers to
//! [`MigrationAdapter`]s and forwards the six migration operations to them,
//! normalizing failures into the migration error family. The async flavor
//! ([`AsyncMigrationRegistry`]) can host synchronous adapters through
//! [`Blocking`].
//!
//! [`FileMigrationAdapter`] is the built-in plugin: a linear revision chain
//! kept as JSON files on disk.

mod adapter;
mod fs;
mod registry;

pub use adapter::{
    AsyncMigrationAdapter, BASE, Blocking, HEAD, MigrationAdapter, MigrationRecord,
};
pub use fs::{FILE_KEY, FileMigrationAdapter};
pub use registry::{AsyncMigrationRegistry, MigrationRegistry};
