use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::time::Duration;

use crate::config::{Config, DatabaseTarget};
use crate::postgres::PostgresStore;

/// One row of the users table, as far as a reset cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub email: String,
    pub role: String,
    /// NULL for accounts that only ever signed in through OAuth.
    pub password_hash: Option<String>,
}

/// The row a reset is allowed to touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub email: String,
    pub role: String,
}

impl Target {
    pub fn from_config(config: &Config) -> Self {
        Target {
            email: config.target_email.clone(),
            role: config.target_role.clone(),
        }
    }
}

pub trait UserStore {
    fn backend(&self) -> &'static str;

    fn find_account(&mut self, email: &str) -> Result<Option<Account>>;

    /// Overwrite the password of the row matching both email and role.
    /// Commits only when exactly one row matched, otherwise rolls back.
    /// Returns the number of rows the UPDATE matched.
    fn replace_password(&mut self, target: &Target, hash: &str) -> Result<u64>;
}

/// Quote a (pre-validated) table name for splicing into SQL.
pub fn quoted(table: &str) -> String {
    format!("\"{}\"", table.replace('"', "\"\""))
}

/// Open the store `DATABASE_URL` points at.
pub fn open(config: &Config) -> Result<Box<dyn UserStore>> {
    match &config.database {
        DatabaseTarget::Postgres(url) => {
            Ok(Box::new(PostgresStore::connect(url, &config.users_table)?))
        }
        DatabaseTarget::Sqlite(path) => Ok(Box::new(SqliteStore::open(path, &config.users_table)?)),
    }
}

pub struct SqliteStore {
    conn: Connection,
    table: String,
}

impl SqliteStore {
    pub fn open(path: &str, table: &str) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .with_context(|| format!("Failed to open SQLite database '{path}'"))?;
        Self::from_connection(conn, table)
    }

    pub fn from_connection(conn: Connection, table: &str) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .context("Failed to apply PRAGMA settings")?;
        conn.busy_timeout(Duration::from_secs(5))
            .context("Failed to set busy timeout")?;
        Ok(SqliteStore { conn, table: table.to_string() })
    }

    /// Create the users table with the columns a reset touches.
    /// Used for local development databases and tests.
    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    email      TEXT NOT NULL UNIQUE,
                    name       TEXT,
                    password   TEXT,
                    role       TEXT NOT NULL DEFAULT 'PARTICIPANT',
                    created_at TEXT DEFAULT CURRENT_TIMESTAMP
                );
                "#,
                table = quoted(&self.table)
            ))
            .context("Failed to initialize users table")?;
        Ok(())
    }

    pub fn insert_account(
        &self,
        email: &str,
        role: &str,
        password_hash: Option<&str>,
    ) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} (email, role, password) VALUES (?1, ?2, ?3)",
                    quoted(&self.table)
                ),
                params![email, role, password_hash],
            )
            .context("Failed to insert account")?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl UserStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn find_account(&mut self, email: &str) -> Result<Option<Account>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT email, role, password FROM {} WHERE email = ?1",
                    quoted(&self.table)
                ),
                params![email],
                |r| {
                    Ok(Account {
                        email: r.get(0)?,
                        role: r.get(1)?,
                        password_hash: r.get(2)?,
                    })
                },
            )
            .optional()
            .context("Failed to look up account")
    }

    fn replace_password(&mut self, target: &Target, hash: &str) -> Result<u64> {
        let tx = self.conn.transaction().context("Failed to start transaction")?;
        let rows = tx
            .execute(
                &format!(
                    "UPDATE {} SET password = ?1 WHERE email = ?2 AND role = ?3",
                    quoted(&self.table)
                ),
                params![hash, target.email, target.role],
            )
            .context("Failed to update password")? as u64;

        if rows == 1 {
            tx.commit().context("Failed to commit transaction")?;
        } else {
            tx.rollback().context("Failed to roll back transaction")?;
        }
        Ok(rows)
    }
}
