use reset_admin::cli;
use reset_admin::config::Config;
use reset_admin::db::{self, SqliteStore, Target, UserStore};
use reset_admin::password::{verify_password, hash_password, HashScheme};
use reset_admin::{reset, ResetError};
use std::collections::HashMap;
use tempfile::TempDir;

// cost 4 keeps bcrypt fast in tests
const FAST: HashScheme = HashScheme::Bcrypt { cost: 4 };

/// In-memory users table seeded the way the web app seeds it.
fn seeded_store() -> SqliteStore {
    let store = SqliteStore::open(":memory:", "User").unwrap();
    store.init_schema().unwrap();
    let old = hash_password("admin123", FAST).unwrap();
    store.insert_account("admin@sportsfest.com", "ADMIN", Some(&old)).unwrap();
    store.insert_account("player@college.edu", "PARTICIPANT", Some(&old)).unwrap();
    store.insert_account("oauth-admin@sportsfest.com", "ADMIN", None).unwrap();
    store
}

fn admin() -> Target {
    Target { email: "admin@sportsfest.com".into(), role: "ADMIN".into() }
}

fn hash_of(store: &mut SqliteStore, email: &str) -> Option<String> {
    store.find_account(email).unwrap().unwrap().password_hash
}

// ---- reset.rs ----

#[test]
fn test_reset_updates_matching_admin() {
    let mut store = seeded_store();
    let before_player = hash_of(&mut store, "player@college.edu");

    let outcome = reset::run(&mut store, &admin(), "N3w-Admin-Pass", FAST, false).unwrap();
    assert!(outcome.verified);
    assert!(!outcome.dry_run);
    assert!(outcome.previous_password_set);

    let stored = hash_of(&mut store, "admin@sportsfest.com").unwrap();
    assert!(verify_password("N3w-Admin-Pass", &stored).unwrap());
    assert!(!verify_password("admin123", &stored).unwrap());

    // other rows untouched
    assert_eq!(hash_of(&mut store, "player@college.edu"), before_player);
}

#[test]
fn test_reset_with_argon2() {
    let mut store = seeded_store();
    reset::run(&mut store, &admin(), "N3w-Admin-Pass", HashScheme::Argon2id, false).unwrap();

    let stored = hash_of(&mut store, "admin@sportsfest.com").unwrap();
    assert!(stored.starts_with("$argon2id$"));
    assert!(verify_password("N3w-Admin-Pass", &stored).unwrap());
}

#[test]
fn test_unknown_email_changes_nothing() {
    let mut store = seeded_store();
    let target = Target { email: "ghost@sportsfest.com".into(), role: "ADMIN".into() };

    let err = reset::run(&mut store, &target, "N3w-Admin-Pass", FAST, false).unwrap_err();
    assert!(matches!(err.downcast_ref::<ResetError>(), Some(ResetError::AccountNotFound { .. })));
}

#[test]
fn test_role_mismatch_changes_nothing() {
    let mut store = seeded_store();
    let before = hash_of(&mut store, "player@college.edu");
    let target = Target { email: "player@college.edu".into(), role: "ADMIN".into() };

    let err = reset::run(&mut store, &target, "N3w-Admin-Pass", FAST, false).unwrap_err();
    match err.downcast_ref::<ResetError>() {
        Some(ResetError::RoleMismatch { found, .. }) => assert_eq!(found, "PARTICIPANT"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(hash_of(&mut store, "player@college.edu"), before);
}

#[test]
fn test_role_comparison_is_exact() {
    let mut store = seeded_store();
    let target = Target { email: "admin@sportsfest.com".into(), role: "admin".into() };
    assert!(reset::run(&mut store, &target, "N3w-Admin-Pass", FAST, false).is_err());
}

#[test]
fn test_dry_run_never_writes() {
    let mut store = seeded_store();
    let before = hash_of(&mut store, "admin@sportsfest.com");

    let outcome = reset::run(&mut store, &admin(), "", FAST, true).unwrap();
    assert!(outcome.dry_run);
    assert!(!outcome.verified);
    assert_eq!(hash_of(&mut store, "admin@sportsfest.com"), before);
}

#[test]
fn test_oauth_only_account_gets_a_password() {
    let mut store = seeded_store();
    let target = Target { email: "oauth-admin@sportsfest.com".into(), role: "ADMIN".into() };

    let outcome = reset::run(&mut store, &target, "N3w-Admin-Pass", FAST, false).unwrap();
    assert!(!outcome.previous_password_set);
    assert!(hash_of(&mut store, "oauth-admin@sportsfest.com").is_some());
}

// ---- config.rs + db.rs ----

#[test]
fn test_open_file_database_from_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.db");
    let url = format!("sqlite:{}", path.display());

    {
        let store = SqliteStore::open(path.to_str().unwrap(), "User").unwrap();
        store.init_schema().unwrap();
        store.insert_account("admin@sportsfest.com", "ADMIN", None).unwrap();
    }

    let env: HashMap<String, String> = [("DATABASE_URL".to_string(), url)].into_iter().collect();
    let matches = cli::build()
        .try_get_matches_from(["reset_admin", "--cost", "4", "--yes"])
        .unwrap();
    let config = Config::from_sources(&env, &matches).unwrap();
    assert!(config.assume_yes);

    let mut store = db::open(&config).unwrap();
    assert_eq!(store.backend(), "sqlite");
    let target = Target::from_config(&config);
    let outcome =
        reset::run(store.as_mut(), &target, "N3w-Admin-Pass", config.scheme, false).unwrap();
    assert_eq!(outcome.scheme, HashScheme::Bcrypt { cost: 4 });
    drop(store);

    // a fresh connection sees the committed row
    let mut reopened = SqliteStore::open(path.to_str().unwrap(), "User").unwrap();
    let stored = hash_of(&mut reopened, "admin@sportsfest.com").unwrap();
    assert!(stored.starts_with("$2b$04$"));
}

#[test]
fn test_custom_table_name() {
    let mut store = SqliteStore::open(":memory:", "users").unwrap();
    store.init_schema().unwrap();
    store.insert_account("ops@example.com", "OWNER", None).unwrap();

    let target = Target { email: "ops@example.com".into(), role: "OWNER".into() };
    assert!(reset::run(&mut store, &target, "N3w-Owner-Pass", FAST, false).unwrap().verified);
}
