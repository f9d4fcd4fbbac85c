use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

use crate::db::{quoted, Account, Target, UserStore};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// PostgreSQL-backed store. The tool is synchronous, so the store drives
/// sqlx on its own current-thread runtime.
pub struct PostgresStore {
    runtime: Runtime,
    pool: PgPool,
    table: String,
}

impl PostgresStore {
    pub fn connect(url: &str, table: &str) -> Result<Self> {
        // Transaction-mode poolers (pgbouncer, supavisor on 6543) cannot keep
        // named prepared statements between transactions.
        let options = PgConnectOptions::from_str(url)
            .context("Invalid PostgreSQL connection URL")?
            .statement_cache_capacity(0)
            .application_name("reset_admin");

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;

        let pool = runtime
            .block_on(
                PgPoolOptions::new()
                    .max_connections(1)
                    .acquire_timeout(CONNECT_TIMEOUT)
                    .connect_with(options),
            )
            .context("Failed to connect to PostgreSQL")?;

        log::debug!("Connected to PostgreSQL");
        Ok(PostgresStore { runtime, pool, table: table.to_string() })
    }
}

impl UserStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn find_account(&mut self, email: &str) -> Result<Option<Account>> {
        // role is a Postgres enum, read it back as text
        let sql = format!(
            "SELECT email, role::text AS role, password FROM {} WHERE email = $1",
            quoted(&self.table)
        );
        let row = self
            .runtime
            .block_on(sqlx::query(&sql).bind(email).fetch_optional(&self.pool))
            .context("Failed to look up account")?;

        row.map(|r| -> Result<Account, sqlx::Error> {
            Ok(Account {
                email: r.try_get("email")?,
                role: r.try_get("role")?,
                password_hash: r.try_get("password")?,
            })
        })
        .transpose()
        .context("Failed to decode account row")
    }

    fn replace_password(&mut self, target: &Target, hash: &str) -> Result<u64> {
        let sql = format!(
            "UPDATE {} SET password = $1 WHERE email = $2 AND role::text = $3",
            quoted(&self.table)
        );
        let pool = &self.pool;

        self.runtime.block_on(async {
            let mut tx = pool.begin().await.context("Failed to start transaction")?;
            let rows = sqlx::query(&sql)
                .bind(hash)
                .bind(&target.email)
                .bind(&target.role)
                .execute(&mut *tx)
                .await
                .context("Failed to update password")?
                .rows_affected();

            if rows == 1 {
                tx.commit().await.context("Failed to commit transaction")?;
            } else {
                tx.rollback().await.context("Failed to roll back transaction")?;
            }
            Ok::<u64, anyhow::Error>(rows)
        })
    }
}

impl Drop for PostgresStore {
    fn drop(&mut self) {
        self.runtime.block_on(self.pool.close());
        log::debug!("PostgreSQL connection closed");
    }
}
