//! Postgres-backed credential store.

use super::{Credential, CredentialStore, StoreError, with_deadline};
use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row};
use std::time::Duration;
use tracing::{Instrument, info_span};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgCredentialStore {
    #[must_use]
    pub const fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Create the `users` table if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error if the schema statements fail.
    pub async fn apply_schema(&self) -> Result<(), StoreError> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "CREATE");
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn insert(&self, email: &str, password_hash: &str) -> Result<(), StoreError> {
        let query = "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        with_deadline(self.timeout, "INSERT users", async {
            sqlx::query(query)
                .bind(Uuid::new_v4())
                .bind(email)
                .bind(password_hash)
                .execute(&self.pool)
                .instrument(span)
                .await
                .map(|_| ())
                .map_err(map_sqlx_error)
        })
        .await
    }

    async fn find(&self, email: &str) -> Result<Option<Credential>, StoreError> {
        let query = r"
            SELECT id, email, password_hash,
                   EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix
            FROM users
            WHERE email = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = with_deadline(self.timeout, "SELECT users", async {
            sqlx::query(query)
                .bind(email)
                .fetch_optional(&self.pool)
                .instrument(span)
                .await
                .map_err(map_sqlx_error)
        })
        .await?;

        Ok(row.map(|row| Credential {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at_unix: row.get("created_at_unix"),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        with_deadline(self.timeout, "PING postgres", async {
            let acquire_span = info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            );
            let mut conn = self
                .pool
                .acquire()
                .instrument(acquire_span)
                .await
                .map_err(map_sqlx_error)?;
            let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
            conn.ping()
                .instrument(ping_span)
                .await
                .map_err(map_sqlx_error)
        })
        .await
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        return StoreError::Conflict;
    }
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
        other => StoreError::Backend(other.to_string()),
    }
}
