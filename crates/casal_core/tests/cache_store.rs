use casal_core::cache::{HOUSEHOLD_KEY, USER_KEY};
use casal_core::db::migrations::latest_version;
use casal_core::db::{open_db, open_db_in_memory, DbError};
use casal_core::{
    CacheError, HouseholdRecord, LocalCacheStore, SessionCache, SessionConfig, SqliteCacheStore,
    UserRecord,
};
use rusqlite::Connection;
use std::sync::Arc;

fn user() -> UserRecord {
    UserRecord {
        uid: "uid-1".to_string(),
        display_name: "Ana".to_string(),
        email: "ana@example.com".to_string(),
        household_id: Some("h-1".to_string()),
    }
}

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "cache_entries");
}

#[test]
fn cached_session_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.sqlite3");
    let household = HouseholdRecord::new("h-1", "Casa", "uid-1", 1_700_000_000_000);

    let first = SessionCache::new(Arc::new(SqliteCacheStore::open(&path).unwrap()));
    first.write(&user(), Some(&household)).unwrap();
    drop(first);

    let config = SessionConfig {
        cache_path: path.clone(),
        ..SessionConfig::default()
    };
    let reopened = SessionCache::new(Arc::new(config.open_cache().unwrap()));
    assert_eq!(reopened.read_user().unwrap(), Some(user()));
    assert_eq!(reopened.read_household().unwrap(), Some(household));

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
}

#[test]
fn configured_cache_path_is_where_the_cache_lives() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested-name.sqlite3");
    let raw = path.to_string_lossy().into_owned();
    let config = SessionConfig::from_lookup(|key| {
        (key == casal_core::config::ENV_CACHE_PATH).then(|| raw.clone())
    })
    .unwrap();

    let cache = SessionCache::new(Arc::new(config.open_cache().unwrap()));
    cache.write(&user(), None).unwrap();

    assert!(path.exists());
    let reopened = SessionCache::new(Arc::new(SqliteCacheStore::open(&path).unwrap()));
    assert_eq!(reopened.read_user().unwrap(), Some(user()));
}

#[test]
fn clear_removes_both_entries_and_is_idempotent() {
    let store = Arc::new(SqliteCacheStore::open_in_memory().unwrap());
    let cache = SessionCache::new(store.clone());
    let household = HouseholdRecord::new("h-1", "Casa", "uid-1", 0);
    cache.write(&user(), Some(&household)).unwrap();

    cache.clear().unwrap();
    cache.clear().unwrap();

    assert_eq!(store.get(USER_KEY).unwrap(), None);
    assert_eq!(store.get(HOUSEHOLD_KEY).unwrap(), None);
}

#[test]
fn household_that_lost_its_owner_reads_as_missing() {
    let store = Arc::new(SqliteCacheStore::open_in_memory().unwrap());
    store
        .set(
            HOUSEHOLD_KEY,
            r#"{"id":"h-1","name":"Casa","ownerId":"uid-1","memberIds":["uid-2"],"createdAt":0}"#,
        )
        .unwrap();

    let cache = SessionCache::new(store);
    assert_eq!(cache.read_household().unwrap(), None);
}

#[test]
fn opening_cache_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = SqliteCacheStore::open(&path).err().expect("newer schema");
    match err {
        CacheError::Db(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
