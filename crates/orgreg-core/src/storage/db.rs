use std::sync::Arc;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, ToSql};

use crate::core::config;
use crate::core::error::AppResult;
use crate::form::FormState;
use crate::storage::migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// A subscriber row from the `subscribers` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    /// Telegram user ID
    pub id: i64,
    /// Telegram @username, if the user has one
    pub handle: Option<String>,
    /// First name as Telegram reported it on first contact
    pub display_name: Option<String>,
    pub organization_name: Option<String>,
    pub address: Option<String>,
    pub contact: Option<String>,
    /// Current form position; `None` when the stored value is not recognized
    pub state: Option<FormState>,
}

impl Subscriber {
    /// All three profile fields are present.
    pub fn is_complete(&self) -> bool {
        self.organization_name.is_some() && self.address.is_some() && self.contact.is_some()
    }
}

/// Typed partial update for a subscriber.
///
/// Each `Some` field is written; `None` leaves the column untouched. The
/// inner `Option` of the profile fields distinguishes "set to NULL" from
/// "set to a value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberPatch {
    pub organization_name: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub contact: Option<Option<String>>,
    pub state: Option<FormState>,
}

impl SubscriberPatch {
    pub fn organization_name(mut self, value: impl Into<String>) -> Self {
        self.organization_name = Some(Some(value.into()));
        self
    }

    pub fn address(mut self, value: impl Into<String>) -> Self {
        self.address = Some(Some(value.into()));
        self
    }

    pub fn contact(mut self, value: impl Into<String>) -> Self {
        self.contact = Some(Some(value.into()));
        self
    }

    pub fn state(mut self, state: FormState) -> Self {
        self.state = Some(state);
        self
    }

    /// Nulls all three profile fields.
    pub fn clear_profile(mut self) -> Self {
        self.organization_name = Some(None);
        self.address = Some(None);
        self.contact = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.organization_name.is_none() && self.address.is_none() && self.contact.is_none() && self.state.is_none()
    }

    /// Column assignments in a fixed order. Column names come from this list
    /// only, never from callers.
    fn assignments(&self) -> Vec<(&'static str, Option<&str>)> {
        let mut columns = Vec::with_capacity(4);
        if let Some(value) = &self.organization_name {
            columns.push(("organization_name", value.as_deref()));
        }
        if let Some(value) = &self.address {
            columns.push(("address", value.as_deref()));
        }
        if let Some(value) = &self.contact {
            columns.push(("contact", value.as_deref()));
        }
        if let Some(state) = self.state {
            columns.push(("state", state.to_column()));
        }
        columns
    }
}

/// Create a new database connection pool
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Example
///
/// ```no_run
/// use orgreg_core::storage::create_pool;
///
/// let pool = create_pool("users.db")?;
/// # Ok::<(), r2d2::Error>(())
/// ```
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path)
        .with_init(|conn| conn.busy_timeout(config::database::busy_timeout()));
    Pool::builder().max_size(config::database::POOL_SIZE).build(manager)
}

/// Get a connection from the pool
///
/// The connection is returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Durable subscriber storage backed by the SQLite pool.
///
/// Every call checks a connection out of the pool; nothing is cached.
#[derive(Clone)]
pub struct SubscriberStore {
    pool: Arc<DbPool>,
}

impl SubscriberStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Applies every pending schema migration. Safe to call on every start.
    pub fn ensure_schema(&self) -> AppResult<()> {
        let mut conn = get_connection(&self.pool)?;
        migrations::run_migrations(&mut conn)
    }

    /// Point lookup by Telegram user ID.
    pub fn get(&self, id: i64) -> AppResult<Option<Subscriber>> {
        let conn = get_connection(&self.pool)?;
        let subscriber = conn
            .query_row(
                "SELECT id, handle, display_name, organization_name, address, contact, state
                 FROM subscribers WHERE id = ?1",
                params![id],
                |row| {
                    let raw_state: Option<String> = row.get(6)?;
                    let state = FormState::from_column(raw_state.as_deref());
                    if state.is_none() {
                        log::warn!("Subscriber {} has unrecognized form state {:?}", id, raw_state);
                    }
                    Ok(Subscriber {
                        id: row.get(0)?,
                        handle: row.get(1)?,
                        display_name: row.get(2)?,
                        organization_name: row.get(3)?,
                        address: row.get(4)?,
                        contact: row.get(5)?,
                        state,
                    })
                },
            )
            .optional()?;
        Ok(subscriber)
    }

    /// Inserts a fresh subscriber awaiting the organization name.
    ///
    /// Returns `false` without touching the row when the ID already exists.
    pub fn create(&self, id: i64, handle: Option<&str>, display_name: Option<&str>) -> AppResult<bool> {
        let conn = get_connection(&self.pool)?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO subscribers (id, handle, display_name, state) VALUES (?1, ?2, ?3, ?4)",
            params![id, handle, display_name, FormState::AwaitingOrgName.to_column()],
        )?;
        if inserted > 0 {
            log::info!("Created subscriber {} (@{})", id, handle.unwrap_or("-"));
        }
        Ok(inserted > 0)
    }

    /// Writes the fields present in `patch`; other columns are left as is.
    ///
    /// The caller guarantees the subscriber exists.
    pub fn update(&self, id: i64, patch: &SubscriberPatch) -> AppResult<()> {
        let assignments = patch.assignments();
        if assignments.is_empty() {
            return Ok(());
        }

        let set_clause = assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE subscribers SET {} WHERE id = ?{}", set_clause, assignments.len() + 1);

        let mut values: Vec<&dyn ToSql> = assignments.iter().map(|(_, value)| value as &dyn ToSql).collect();
        values.push(&id);

        let conn = get_connection(&self.pool)?;
        let updated = conn.execute(&sql, values.as_slice())?;
        if updated == 0 {
            log::warn!("Update for unknown subscriber {} matched no rows", id);
        }
        Ok(())
    }

    /// Number of subscriber rows.
    pub fn count(&self) -> AppResult<i64> {
        let conn = get_connection(&self.pool)?;
        let count = conn.query_row("SELECT COUNT(*) FROM subscribers", [], |row| row.get(0))?;
        Ok(count)
    }
}
