use dapter_cli::*;
use dapter_core::ErrorKind;
use dapter_formats::FormatConfig;
use pretty_assertions::assert_eq;
use serde_json::json;

fn table() -> dapter_core::AdapterTable {
    build_table(&FormatConfig::default()).unwrap()
}

// ── Convert ─────────────────────────────────────────────────────

#[test]
fn lists_builtin_formats() {
    assert_eq!(list_formats(&table()), vec!["csv", "json", "toml"]);
}

#[test]
fn converts_json_batch_to_csv() {
    let input = r#"[{"id": 1, "name": "ada"}, {"id": 2, "name": "grace"}]"#;

    let csv = convert(&table(), input, "json", "csv", true).unwrap();

    assert_eq!(csv, "id,name\n1,ada\n2,grace\n");
}

#[test]
fn converts_csv_back_to_json_as_text() {
    let input = "id,name\n1,ada\n2,\n";

    let text = convert(&table(), input, "csv", "json", true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(value, json!([{"id": "1", "name": "ada"}, {"id": "2", "name": null}]));
}

#[test]
fn converts_single_toml_table_to_json() {
    let input = "name = \"ada\"\n\n[address]\ncity = \"London\"\n";

    let text = convert(&table(), input, "toml", "json", false).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(value, json!({"name": "ada", "address": {"city": "London"}}));
}

#[test]
fn config_changes_the_registered_adapters() {
    let config = FormatConfig::from_toml_str("[csv]\ndelimiter = \";\"\n").unwrap();
    let table = build_table(&config).unwrap();

    let csv = convert(&table, r#"{"a": 1, "b": 2}"#, "json", "csv", false).unwrap();

    assert_eq!(csv, "a;b\n1;2\n");
}

#[test]
fn unknown_format_is_not_found() {
    let err = convert(&table(), "{}", "json", "yaml", false).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AdapterNotFound);
    assert!(err.to_string().contains("No adapter registered for 'yaml'"));
}

#[test]
fn bad_input_is_a_parse_error() {
    let err = convert(&table(), "{not json", "json", "csv", false).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
}

// ── Migrate ─────────────────────────────────────────────────────

#[test]
fn migrate_walks_a_revision_chain() {
    let dir = tempfile::tempdir().unwrap();
    let dir = dir.path();

    let out = migrate(dir, &MigrateAction::Init { force: false }).unwrap();
    assert!(out.starts_with("Initialized migrations in"));
    assert_eq!(migrate(dir, &MigrateAction::Current).unwrap(), "base");

    let create = |message: &str| {
        let out = migrate(
            dir,
            &MigrateAction::Create {
                message: message.to_string(),
                no_autogenerate: false,
            },
        )
        .unwrap();
        out.trim_start_matches("Created revision ").to_string()
    };
    let first = create("create users");
    let second = create("add email");

    let out = migrate(
        dir,
        &MigrateAction::Upgrade {
            revision: "head".to_string(),
        },
    )
    .unwrap();
    assert_eq!(out, format!("Upgraded to {second}"));

    let history = migrate(dir, &MigrateAction::History).unwrap();
    assert_eq!(
        history,
        format!(
            "{first} -> {second} (head) (current), add email\n<base> -> {first}, create users"
        )
    );

    let out = migrate(
        dir,
        &MigrateAction::Downgrade {
            revision: "-1".to_string(),
        },
    )
    .unwrap();
    assert_eq!(out, format!("Downgraded to {first}"));
    assert_eq!(migrate(dir, &MigrateAction::Current).unwrap(), first);
}

#[test]
fn migrate_without_init_fails() {
    let dir = tempfile::tempdir().unwrap();

    let err = migrate(dir.path(), &MigrateAction::History).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Migration);
}
