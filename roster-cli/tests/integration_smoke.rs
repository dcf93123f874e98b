//! Smoke tests for command wiring and fail-fast configuration checks

use assert_cmd::Command;
use predicates::prelude::*;

/// `roster` with every configuration variable cleared, run from an empty
/// directory so no `.env` file is picked up.
fn roster(cwd: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("roster").unwrap();
    cmd.current_dir(cwd)
        .env_remove("DB_URI")
        .env_remove("MIGRATIONS_DIR")
        .env_remove("BIND_ADDR")
        .env_remove("DB_MAX_CONNECTIONS")
        .env_remove("INSERT_TIMEOUT_SECS")
        .env_remove("REQUEST_TIMEOUT_SECS");
    cmd
}

// === Help Output ===

#[test]
fn test_top_level_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    roster(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("migrate"));
}

#[test]
fn test_serve_help_mentions_env_vars() {
    let dir = tempfile::tempdir().unwrap();
    roster(dir.path())
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("DB_URI"))
        .stdout(predicate::str::contains("MIGRATIONS_DIR"));
}

#[test]
fn test_migrate_down_help() {
    let dir = tempfile::tempdir().unwrap();
    roster(dir.path())
        .args(["migrate", "down", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Number of migrations to revert"));
}

// === Configuration Failures ===

#[test]
fn test_serve_without_db_uri_fails() {
    let dir = tempfile::tempdir().unwrap();
    roster(dir.path())
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DB_URI"));
}

#[test]
fn test_serve_without_migrations_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    roster(dir.path())
        .arg("serve")
        .env("DB_URI", "postgres://roster@localhost/roster")
        .assert()
        .failure()
        .stderr(predicate::str::contains("MIGRATIONS_DIR"));
}

#[test]
fn test_serve_with_missing_migrations_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    roster(dir.path())
        .arg("serve")
        .env("DB_URI", "postgres://roster@localhost/roster")
        .env("MIGRATIONS_DIR", dir.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_serve_with_malformed_db_uri_fails() {
    let dir = tempfile::tempdir().unwrap();
    roster(dir.path())
        .args(["serve", "--database-url", "not a url"])
        .arg("--migrations-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid database URI"));
}

#[test]
fn test_serve_with_unreachable_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    roster(dir.path())
        .args(["serve", "--insert-timeout-secs", "1"])
        .env("DB_URI", "postgres://roster@127.0.0.1:1/roster")
        .env("MIGRATIONS_DIR", dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to connect to database"));
}

#[test]
fn test_serve_rejects_insert_timeout_not_below_request_timeout() {
    let dir = tempfile::tempdir().unwrap();
    roster(dir.path())
        .args(["serve", "--insert-timeout-secs", "30", "--request-timeout-secs", "10"])
        .env("DB_URI", "postgres://roster@127.0.0.1:1/roster")
        .env("MIGRATIONS_DIR", dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("shorter than request timeout"));
}
