//! State file, catalog file and config file integration tests.

use assert_fs::prelude::*;
use dynamics_core::{
    catalog::Catalog, state, CatalogError, Config, ConfigError, ReplicationState, StateError,
    Watermark,
};
use predicates::prelude::predicate;

// ---------------------------------------------------------------------------
// 1. State
// ---------------------------------------------------------------------------

#[test]
fn save_writes_singer_state_shape() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("state.json");

    let mut st = ReplicationState::default();
    st.bookmarks
        .insert("accounts".into(), Watermark::from("2020-03-01T00:00:00Z"));
    state::save_at(file.path(), &st).expect("save");

    file.assert(predicate::path::exists());
    file.assert(predicate::str::contains(r#""accounts": "2020-03-01T00:00:00Z""#));
    file.assert(predicate::str::contains(r#""currently_syncing": null"#));
}

#[test]
fn corrupt_state_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("state.json");
    file.write_str("{ not json").expect("write");

    let err = state::load_at(file.path()).unwrap_err();
    assert!(matches!(err, StateError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("state.json"));
}

#[test]
fn overwrite_replaces_previous_state() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("state.json");

    let mut st = ReplicationState::default();
    st.currently_syncing = Some("accounts".into());
    state::save_at(file.path(), &st).expect("first save");

    st.currently_syncing = None;
    state::save_at(file.path(), &st).expect("second save");

    let loaded = state::load_at(file.path()).expect("load");
    assert!(loaded.currently_syncing.is_none());
}

// ---------------------------------------------------------------------------
// 2. Catalog
// ---------------------------------------------------------------------------

#[test]
fn catalog_loads_singer_document() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("catalog.json");
    file.write_str(
        r#"{
          "streams": [{
            "tap_stream_id": "accounts",
            "stream": "accounts",
            "key_properties": ["accountid"],
            "schema": {"type": "object", "properties": {"accountid": {"type": ["null", "string"]}}},
            "metadata": [{"breadcrumb": [], "metadata": {"selected": true}}]
          }]
        }"#,
    )
    .expect("write");

    let catalog = Catalog::load_at(file.path()).expect("load");
    let stream = catalog.get_stream("accounts").expect("stream");
    assert!(stream.is_selected());
    assert_eq!(stream.key_properties, vec!["accountid"]);
    assert!(stream.schema.properties.contains_key("accountid"));
}

#[test]
fn missing_catalog_is_io_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = Catalog::load_at(&home.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, CatalogError::Io { .. }));
}

// ---------------------------------------------------------------------------
// 3. Config
// ---------------------------------------------------------------------------

#[test]
fn config_without_credentials_is_rejected() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("config.json");
    file.write_str(r#"{"url": "https://org.crm.dynamics.com", "start_date": "2020-01-01T00:00:00Z"}"#)
        .expect("write");

    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::MissingCredentials), "got: {err}");
}

#[test]
fn malformed_config_names_the_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("config.json");
    file.write_str("[1, 2").expect("write");

    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Json { .. }));
    assert!(err.to_string().contains("config.json"));
}
