//! Schema migrations
//!
//! Versioned SQL lives in `migrations/` and is applied by refinery. Databases
//! written by releases that predate versioning are patched up by the
//! compatibility steps around it, which only ever add what is missing.

use rusqlite::Connection;
use std::sync::{Mutex, OnceLock};

use crate::core::config;
use crate::core::error::AppResult;

mod embedded {
    use refinery::embed_migrations;

    embed_migrations!("./migrations");
}

static MIGRATION_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Columns every `subscribers` table must end up with, besides `id`.
const SUBSCRIBER_COLUMNS: &[(&str, &str)] = &[
    ("handle", "TEXT"),
    ("display_name", "TEXT"),
    ("organization_name", "TEXT"),
    ("address", "TEXT"),
    ("contact", "TEXT"),
    ("state", "TEXT DEFAULT NULL"),
];

/// Brings the schema up to date. Safe to run on every start.
pub fn run_migrations(conn: &mut Connection) -> AppResult<()> {
    let mutex = MIGRATION_LOCK.get_or_init(|| Mutex::new(()));
    let _guard = match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Migration lock was poisoned, recovering...");
            poisoned.into_inner()
        }
    };

    conn.busy_timeout(config::database::busy_timeout())?;

    add_missing_subscriber_columns(conn)?;

    let report = embedded::migrations::runner().run(conn)?;
    for migration in report.applied_migrations() {
        log::info!("Applied migration {}", migration);
    }

    import_legacy_users(conn)?;
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| Ok(row.get::<_, i64>(0)? > 0),
    )
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// Adds the columns an unversioned `subscribers` table may lack.
///
/// A missing table is left to `V1__create_subscribers`.
fn add_missing_subscriber_columns(conn: &Connection) -> rusqlite::Result<()> {
    if !table_exists(conn, "subscribers")? {
        return Ok(());
    }

    let columns = table_columns(conn, "subscribers")?;
    for (column, definition) in SUBSCRIBER_COLUMNS {
        if columns.iter().any(|c| c == column) {
            continue;
        }
        log::info!("Adding missing column: {} to subscribers table", column);
        conn.execute(&format!("ALTER TABLE subscribers ADD COLUMN {} {}", column, definition), [])?;
    }
    Ok(())
}

/// Copies users registered by the first-generation bot, which only kept
/// `users(user_id, username, first_name)`. They land with no form state and
/// re-enter the form on /start.
fn import_legacy_users(conn: &Connection) -> rusqlite::Result<()> {
    if !table_exists(conn, "users")? {
        return Ok(());
    }
    let columns = table_columns(conn, "users")?;
    if !["user_id", "username", "first_name"]
        .iter()
        .all(|needed| columns.iter().any(|c| c == needed))
    {
        log::warn!("Table users has an unexpected layout {:?}, skipping import", columns);
        return Ok(());
    }

    let imported = conn.execute(
        "INSERT OR IGNORE INTO subscribers (id, handle, display_name, state)
         SELECT user_id, NULLIF(username, ''), NULLIF(first_name, ''), NULL FROM users",
        [],
    )?;
    if imported > 0 {
        log::info!("Imported {} legacy user(s)", imported);
    }
    Ok(())
}
