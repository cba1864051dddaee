mod common;

use common::*;
use dapter_core::{ContextValue, ErrorKind};
use dapter_migrations::*;
use pretty_assertions::assert_eq;
use std::error::Error as _;
use std::path::Path;

fn registry() -> MigrationRegistry {
    let mut registry = MigrationRegistry::new();
    registry.register(StubMigrations::default()).unwrap();
    registry.register(Broken).unwrap();
    registry.register(Classified).unwrap();
    registry
}

fn ctx<'a>(err: &'a dapter_core::AdapterError, key: &str) -> Option<&'a str> {
    err.context_value(key).and_then(ContextValue::as_str)
}

// ── Registration ────────────────────────────────────────────────

#[test]
fn register_and_create_migration() {
    let registry = registry();

    let revision = registry
        .create_migration("test", "Test migration", true, &opts())
        .unwrap();

    assert_eq!(revision, "revision123");
    assert!(registry.contains("test"));
    assert_eq!(registry.keys(), vec!["broken", "classified", "test"]);
}

#[test]
fn register_rejects_blank_key() {
    let mut registry = MigrationRegistry::new();
    let err = registry.register(Keyless).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("Migration adapter must define 'migration_key'"));
    assert!(registry.keys().is_empty());
}

#[test]
fn reregistering_a_key_replaces_the_adapter() {
    let mut registry = registry();
    registry
        .register(StubMigrations {
            current: Some("pinned".to_string()).into(),
        })
        .unwrap();

    assert_eq!(
        registry.get_current_revision("test", &opts()).unwrap(),
        Some("pinned".to_string())
    );
}

#[test]
fn unknown_key_is_not_found() {
    let registry = registry();
    let err = registry.upgrade("missing", HEAD, &opts()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AdapterNotFound);
    assert!(err.to_string().contains("No migration adapter registered for 'missing'"));
    assert_eq!(ctx(&err, "migration_key"), Some("missing"));
    assert_eq!(
        err.context_value("available").and_then(ContextValue::as_list),
        Some(&["broken".to_string(), "classified".to_string(), "test".to_string()][..])
    );
}

// ── Forwarding ──────────────────────────────────────────────────

#[test]
fn operations_forward_to_the_adapter() {
    let registry = registry();

    registry.init_migrations("test", Path::new("migrations"), &opts()).unwrap();
    assert_eq!(registry.get_current_revision("test", &opts()).unwrap(), None);

    registry.upgrade("test", HEAD, &opts()).unwrap();
    assert_eq!(
        registry.get_current_revision("test", &opts()).unwrap().as_deref(),
        Some(HEAD)
    );

    registry.downgrade("test", BASE, &opts()).unwrap();
    assert_eq!(
        registry.get_current_revision("test", &opts()).unwrap().as_deref(),
        Some(BASE)
    );

    let history = registry.get_migration_history("test", &opts()).unwrap();
    assert_eq!(history, vec![MigrationRecord::new("revision123", "Test migration")]);
}

// ── Error wrapping ──────────────────────────────────────────────

#[test]
fn init_failure_is_wrapped() {
    let err = registry()
        .init_migrations("broken", Path::new("db/migrations"), &opts())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MigrationInit);
    assert!(err.to_string().starts_with("Failed to initialize migrations for 'broken'"));
    assert_eq!(ctx(&err, "directory"), Some("db/migrations"));
    assert_eq!(ctx(&err, "adapter"), Some("Broken"));
    assert_eq!(ctx(&err, "original_error"), Some("database locked"));
    assert_eq!(err.source().unwrap().to_string(), "database locked");
}

#[test]
fn create_failure_is_wrapped() {
    let err = registry()
        .create_migration("broken", "add users", false, &opts())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MigrationCreation);
    assert_eq!(err.message(), "Failed to create migration for 'broken'");
    assert_eq!(ctx(&err, "message_text"), Some("add users"));
    assert_eq!(
        err.context_value("autogenerate").and_then(ContextValue::as_bool),
        Some(false)
    );
}

#[test]
fn upgrade_and_downgrade_failures_carry_the_revision() {
    let registry = registry();

    let up = registry.upgrade("broken", "ae1027a6acf", &opts()).unwrap_err();
    assert_eq!(up.kind(), ErrorKind::MigrationUpgrade);
    assert_eq!(up.message(), "Failed to upgrade migrations for 'broken'");
    assert_eq!(ctx(&up, "revision"), Some("ae1027a6acf"));

    let down = registry.downgrade("broken", BASE, &opts()).unwrap_err();
    assert_eq!(down.kind(), ErrorKind::MigrationDowngrade);
    assert_eq!(down.message(), "Failed to downgrade migrations for 'broken'");
    assert_eq!(ctx(&down, "revision"), Some(BASE));
}

#[test]
fn query_failures_use_the_base_migration_kind() {
    let registry = registry();

    let current = registry.get_current_revision("broken", &opts()).unwrap_err();
    assert_eq!(current.kind(), ErrorKind::Migration);
    assert_eq!(current.message(), "Failed to get current revision for 'broken'");

    let history = registry.get_migration_history("broken", &opts()).unwrap_err();
    assert_eq!(history.kind(), ErrorKind::Migration);
    assert_eq!(history.message(), "Failed to get migration history for 'broken'");
    assert_eq!(ctx(&history, "original_error"), Some("history table missing"));
    assert!(history.source().is_some());
}

#[test]
fn migration_family_errors_pass_through() {
    let registry = registry();

    let err = registry.upgrade("classified", "abc123", &opts()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MigrationNotFound);
    assert_eq!(err.message(), "Revision 'abc123' not found");
    assert!(err.context_value("original_error").is_none());

    let err = registry
        .create_migration("classified", "x", true, &opts())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MigrationCreation);
    assert_eq!(ctx(&err, "template"), Some("script.py.mako"));
}

#[test]
fn other_taxonomy_errors_are_wrapped() {
    let registry = registry();

    let err = registry
        .init_migrations("classified", Path::new("ro"), &opts())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MigrationInit);
    assert_eq!(ctx(&err, "original_error"), Some("directory is read-only"));

    let cause = err
        .source()
        .and_then(|e| e.downcast_ref::<dapter_core::AdapterError>())
        .unwrap();
    assert_eq!(cause.kind(), ErrorKind::Resource);

    let err = registry.downgrade("classified", "-1", &opts()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MigrationDowngrade);
    assert!(err.is(ErrorKind::Migration));
    assert!(err.is(ErrorKind::Adapter));
}
