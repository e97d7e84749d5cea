//! # Database Persistence Layer
//!
//! Postgres persistence for the bid ledger via SQLx.
//!
//! The database is **optional**. When `DATABASE_URL` is set, disputes and
//! bids live in PostgreSQL behind [`PgLedger`]. When absent, the API runs on
//! the in-memory ledger (suitable for development and testing) and all
//! state is lost on restart.
//!
//! Schema (see `migrations/`):
//!
//! - `disputes(id, created_at)`
//! - `bids(id, dispute_id, amount, created_at, updated_at, state)`, indexed
//!   by `dispute_id`, with a partial unique index admitting at most one
//!   `pending` bid per dispute.

pub mod ledger;

pub use ledger::PgLedger;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if no database URL is configured (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!(
            "DATABASE_URL not set, running on the in-memory ledger. \
             Disputes and bids will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
