//! Postgres-backed [`LedgerStore`].
//!
//! Guarded commits run in one transaction that first locks the dispute row
//! with `SELECT ... FOR UPDATE`, so placements and resolutions on the same
//! dispute are serialized across every service instance sharing the
//! database. The partial unique index on pending bids is the last line:
//! a second pending bid for a dispute fails the insert and surfaces as a
//! conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::{Amount, BidId, DisputeId, Timestamp};
use parley_state::lifecycle::{Placement, Transition};
use parley_state::{Bid, BidState, Dispute, DisputeLedger, LedgerStore, StoreError};
use sqlx::{PgPool, Postgres, Transaction};

const BID_COLUMNS: &str = "id, dispute_id, amount, state, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct DisputeRow {
    id: i64,
    created_at: DateTime<Utc>,
}

impl DisputeRow {
    fn into_dispute(self) -> Result<Dispute, StoreError> {
        Ok(Dispute {
            id: DisputeId::new(self.id).map_err(corrupt)?,
            created_at: Timestamp::from_datetime(self.created_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct BidRow {
    id: i64,
    dispute_id: i64,
    amount: i64,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BidRow {
    fn into_bid(self) -> Result<Bid, StoreError> {
        Ok(Bid {
            id: BidId::new(self.id).map_err(corrupt)?,
            dispute_id: DisputeId::new(self.dispute_id).map_err(corrupt)?,
            amount: Amount::new(self.amount).map_err(corrupt)?,
            state: self.state.parse::<BidState>().map_err(corrupt)?,
            created_at: Timestamp::from_datetime(self.created_at),
            updated_at: Timestamp::from_datetime(self.updated_at),
        })
    }
}

fn corrupt(err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

/// Map a server-reported SQLSTATE to a store error. Codes outside the
/// transient classes mean the schema and the code disagree.
fn sqlstate_error(code: &str, message: String) -> StoreError {
    match code {
        // serialization_failure, deadlock_detected
        "40001" | "40P01" => StoreError::Conflict(message),
        // connection exception, transaction rollback, insufficient resources,
        // operator intervention, system error
        _ if matches!(code.get(..2), Some("08" | "40" | "53" | "57" | "58")) => {
            StoreError::Unavailable(message)
        }
        _ => StoreError::Corrupt(message),
    }
}

fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("concurrent write rejected: {db}"))
        }
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => sqlstate_error(&code, err.to_string()),
            None => StoreError::Corrupt(err.to_string()),
        },
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => StoreError::Corrupt(err.to_string()),
        _ => StoreError::Unavailable(err.to_string()),
    }
}

/// Ledger store over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Wrap a pool whose migrations have been applied.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn head_in(
        tx: &mut Transaction<'_, Postgres>,
        dispute_id: DisputeId,
    ) -> Result<Option<BidId>, StoreError> {
        let head: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM bids WHERE dispute_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(dispute_id.get())
        .fetch_optional(&mut **tx)
        .await
        .map_err(store_error)?;

        head.map(BidId::new).transpose().map_err(corrupt)
    }
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn create_dispute(&self, created_at: Timestamp) -> Result<Dispute, StoreError> {
        let row = sqlx::query_as::<_, DisputeRow>(
            "INSERT INTO disputes (created_at) VALUES ($1) RETURNING id, created_at",
        )
        .bind(*created_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        row.into_dispute()
    }

    async fn find_dispute(&self, id: DisputeId) -> Result<Option<Dispute>, StoreError> {
        let row = sqlx::query_as::<_, DisputeRow>(
            "SELECT id, created_at FROM disputes WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(DisputeRow::into_dispute).transpose()
    }

    async fn load_dispute(&self, id: DisputeId) -> Result<Option<DisputeLedger>, StoreError> {
        let Some(dispute) = self.find_dispute(id).await? else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, BidRow>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE dispute_id = $1 ORDER BY id DESC"
        ))
        .bind(id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        let bids = rows
            .into_iter()
            .map(BidRow::into_bid)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(DisputeLedger { dispute, bids }))
    }

    async fn latest_bid(&self, dispute_id: DisputeId) -> Result<Option<Bid>, StoreError> {
        let row = sqlx::query_as::<_, BidRow>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE dispute_id = $1 ORDER BY id DESC LIMIT 1"
        ))
        .bind(dispute_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(BidRow::into_bid).transpose()
    }

    async fn find_bid(&self, id: BidId) -> Result<Option<Bid>, StoreError> {
        let row = sqlx::query_as::<_, BidRow>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(BidRow::into_bid).transpose()
    }

    async fn commit_placement(&self, placement: &Placement) -> Result<Bid, StoreError> {
        let at = *placement.at.as_datetime();
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        // Serialize against every other writer on this dispute.
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM disputes WHERE id = $1 FOR UPDATE")
                .bind(placement.dispute_id.get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(store_error)?;
        if locked.is_none() {
            return Err(StoreError::Conflict(format!(
                "{} disappeared before the bid was committed",
                placement.dispute_id
            )));
        }

        let head = Self::head_in(&mut tx, placement.dispute_id).await?;
        if head != placement.expected_head {
            return Err(StoreError::Conflict(format!(
                "negotiation head of {} moved from {:?} to {:?}",
                placement.dispute_id,
                placement.expected_head.map(BidId::get),
                head.map(BidId::get)
            )));
        }

        if let Some(prior) = placement.supersede {
            let voided = sqlx::query(
                "UPDATE bids SET state = $1, updated_at = $2 WHERE id = $3 AND state = $4",
            )
            .bind(BidState::Voided.as_str())
            .bind(at)
            .bind(prior.get())
            .bind(BidState::Pending.as_str())
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

            if voided.rows_affected() != 1 {
                return Err(StoreError::Conflict(format!(
                    "{prior} can no longer be superseded"
                )));
            }
        }

        let row = sqlx::query_as::<_, BidRow>(&format!(
            "INSERT INTO bids (dispute_id, amount, state, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)
             RETURNING {BID_COLUMNS}"
        ))
        .bind(placement.dispute_id.get())
        .bind(placement.amount.get())
        .bind(BidState::Pending.as_str())
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        row.into_bid()
    }

    async fn commit_transition(&self, transition: &Transition) -> Result<Bid, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        sqlx::query("SELECT id FROM disputes WHERE id = $1 FOR UPDATE")
            .bind(transition.dispute_id.get())
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        let row = sqlx::query_as::<_, BidRow>(&format!(
            "UPDATE bids SET state = $1, updated_at = $2
             WHERE id = $3 AND state = $4
             RETURNING {BID_COLUMNS}"
        ))
        .bind(transition.to.as_str())
        .bind(*transition.at.as_datetime())
        .bind(transition.bid_id.get())
        .bind(transition.from.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_error)?;

        let Some(row) = row else {
            return Err(StoreError::Conflict(format!(
                "{} is no longer {}",
                transition.bid_id, transition.from
            )));
        };

        tx.commit().await.map_err(store_error)?;
        row.into_bid()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(state: &str) -> BidRow {
        let now = Utc::now();
        BidRow {
            id: 4,
            dispute_id: 2,
            amount: 150,
            state: state.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn bid_row_maps_to_domain_record() {
        let bid = row("voided").into_bid().unwrap();
        assert_eq!(bid.id.get(), 4);
        assert_eq!(bid.dispute_id.get(), 2);
        assert_eq!(bid.amount.get(), 150);
        assert_eq!(bid.state, BidState::Voided);
    }

    #[test]
    fn unknown_state_is_corrupt() {
        let err = row("withdrawn").into_bid().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn negative_amount_is_corrupt() {
        let mut bad = row("pending");
        bad.amount = -1;
        assert!(matches!(bad.into_bid().unwrap_err(), StoreError::Corrupt(_)));
    }

    #[test]
    fn dispute_row_maps_to_domain_record() {
        let dispute = DisputeRow {
            id: 7,
            created_at: Utc::now(),
        }
        .into_dispute()
        .unwrap();
        assert_eq!(dispute.id.get(), 7);
    }

    #[test]
    fn connection_failures_are_unavailable() {
        assert!(matches!(
            store_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            store_error(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
    }

    #[derive(Debug)]
    struct ServerError(&'static str);

    impl std::fmt::Display for ServerError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "server error {}", self.0)
        }
    }

    impl std::error::Error for ServerError {}

    impl sqlx::error::DatabaseError for ServerError {
        fn message(&self) -> &str {
            "server error"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.0.into())
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            match self.0 {
                "23505" => sqlx::error::ErrorKind::UniqueViolation,
                _ => sqlx::error::ErrorKind::Other,
            }
        }
    }

    fn server(code: &'static str) -> StoreError {
        store_error(sqlx::Error::Database(Box::new(ServerError(code))))
    }

    #[test]
    fn server_side_outages_are_unavailable() {
        for code in ["08006", "53300", "57P01", "57014", "58030", "40002"] {
            assert!(
                matches!(server(code), StoreError::Unavailable(_)),
                "{code} should be unavailable"
            );
        }
    }

    #[test]
    fn serialization_failures_and_deadlocks_are_conflicts() {
        for code in ["40001", "40P01", "23505"] {
            assert!(
                matches!(server(code), StoreError::Conflict(_)),
                "{code} should be a conflict"
            );
        }
    }

    #[test]
    fn schema_errors_are_corrupt() {
        for code in ["42P01", "42703", "22P02"] {
            assert!(
                matches!(server(code), StoreError::Corrupt(_)),
                "{code} should be corrupt"
            );
        }
    }

    #[test]
    fn decode_failures_are_corrupt() {
        assert!(matches!(
            store_error(sqlx::Error::ColumnNotFound("state".into())),
            StoreError::Corrupt(_)
        ));
    }
}
