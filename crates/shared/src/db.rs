use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::{Bill, NewBill, VoteTally, VoteType};
use crate::resilience::{BreakerState, CircuitBreaker};

/// Failure modes of the bill store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The circuit breaker is open; the database was not contacted.
    #[error("database circuit breaker is open")]
    CircuitOpen,
    #[error("bill not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// True for outage-shaped errors where cached content should be served.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::CircuitOpen | StoreError::Database(_))
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS bills (
        id BIGSERIAL PRIMARY KEY,
        slug TEXT NOT NULL UNIQUE,
        congress INTEGER NOT NULL,
        bill_type TEXT NOT NULL,
        number INTEGER NOT NULL,
        title TEXT NOT NULL,
        latest_action TEXT,
        latest_action_date TEXT,
        source_url TEXT NOT NULL,
        summary_overview TEXT,
        summary_points TEXT[] NOT NULL DEFAULT '{}',
        tweeted BOOLEAN NOT NULL DEFAULT FALSE,
        tweet_url TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS votes (
        id BIGSERIAL PRIMARY KEY,
        bill_id BIGINT NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
        voter_id TEXT NOT NULL,
        vote_type TEXT NOT NULL CHECK (vote_type IN ('yes', 'no', 'unsure')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (bill_id, voter_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS votes_bill_idx ON votes (bill_id)",
];

const BILL_COLUMNS: &str = "id, slug, congress, bill_type, number, title, latest_action, \
     latest_action_date, source_url, summary_overview, summary_points, \
     tweeted, tweet_url, created_at";

/// PostgreSQL-backed bill and vote store.
///
/// Every operation passes through a shared circuit breaker: after repeated
/// connection failures the store fails fast with `StoreError::CircuitOpen`
/// instead of stacking up 5-second connection timeouts.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
    breaker: Arc<CircuitBreaker>,
}

impl Store {
    /// Create the store without touching the database. The first query pays
    /// the connection cost, so process startup never blocks on an outage.
    pub fn connect_lazy(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(12)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)?;

        Ok(Self {
            pool,
            breaker: Arc::new(CircuitBreaker::new()),
        })
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    fn check_breaker(&self) -> Result<(), StoreError> {
        if self.breaker.try_acquire() {
            Ok(())
        } else {
            debug!("store call rejected: circuit open");
            Err(StoreError::CircuitOpen)
        }
    }

    fn observe<T>(&self, result: Result<T, sqlx::Error>) -> Result<T, StoreError> {
        match result {
            Ok(value) => {
                self.breaker.record_success();
                Ok(value)
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e.into())
            }
        }
    }

    /// Idempotent schema setup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        self.check_breaker()?;
        for statement in SCHEMA {
            if let Err(e) = sqlx::query(statement).execute(&self.pool).await {
                return self.observe(Err(e));
            }
        }
        self.observe(Ok(()))
    }

    /// Liveness probe used by `/healthz/db`.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.check_breaker()?;
        let result = sqlx::query("SELECT 1").execute(&self.pool).await;
        self.observe(result.map(|_| ()))
    }

    /// Insert a bill, or refresh its metadata and summary if the slug exists.
    pub async fn upsert_bill(&self, bill: &NewBill) -> Result<Bill, StoreError> {
        self.check_breaker()?;
        let query = format!(
            r#"
            INSERT INTO bills
                (slug, congress, bill_type, number, title, latest_action,
                 latest_action_date, source_url, summary_overview, summary_points)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (slug) DO UPDATE SET
                title = EXCLUDED.title,
                latest_action = EXCLUDED.latest_action,
                latest_action_date = EXCLUDED.latest_action_date,
                summary_overview = EXCLUDED.summary_overview,
                summary_points = EXCLUDED.summary_points
            RETURNING {}
            "#,
            BILL_COLUMNS
        );
        let result = sqlx::query_as::<_, Bill>(&query)
            .bind(&bill.slug)
            .bind(bill.congress)
            .bind(&bill.bill_type)
            .bind(bill.number)
            .bind(&bill.title)
            .bind(&bill.latest_action)
            .bind(&bill.latest_action_date)
            .bind(&bill.source_url)
            .bind(&bill.summary_overview)
            .bind(&bill.summary_points)
            .fetch_one(&self.pool)
            .await;
        self.observe(result)
    }

    /// The most recently posted bill, i.e. the one the site features.
    pub async fn latest_posted_bill(&self) -> Result<Option<Bill>, StoreError> {
        self.check_breaker()?;
        let query = format!(
            "SELECT {} FROM bills WHERE tweeted ORDER BY created_at DESC LIMIT 1",
            BILL_COLUMNS
        );
        let result = sqlx::query_as::<_, Bill>(&query)
            .fetch_optional(&self.pool)
            .await;
        self.observe(result)
    }

    pub async fn bill_by_slug(&self, slug: &str) -> Result<Option<Bill>, StoreError> {
        self.check_breaker()?;
        let query = format!("SELECT {} FROM bills WHERE slug = $1", BILL_COLUMNS);
        let result = sqlx::query_as::<_, Bill>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await;
        self.observe(result)
    }

    /// Whether a bill has already been posted (used to skip duplicates).
    pub async fn is_posted(&self, slug: &str) -> Result<bool, StoreError> {
        self.check_breaker()?;
        let result = sqlx::query("SELECT tweeted FROM bills WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await;
        let row = self.observe(result)?;
        Ok(row.map(|r| r.get::<bool, _>("tweeted")).unwrap_or(false))
    }

    pub async fn mark_posted(&self, slug: &str, tweet_url: &str) -> Result<(), StoreError> {
        self.check_breaker()?;
        let result = sqlx::query("UPDATE bills SET tweeted = TRUE, tweet_url = $2 WHERE slug = $1")
            .bind(slug)
            .bind(tweet_url)
            .execute(&self.pool)
            .await;
        let done = self.observe(result)?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(slug.to_string()));
        }
        Ok(())
    }

    /// Record a voter's position; voting again replaces the previous vote.
    pub async fn record_vote(
        &self,
        bill_id: i64,
        voter_id: &str,
        vote: VoteType,
    ) -> Result<(), StoreError> {
        self.check_breaker()?;
        let result = sqlx::query(
            r#"
            INSERT INTO votes (bill_id, voter_id, vote_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (bill_id, voter_id) DO UPDATE SET
                vote_type = EXCLUDED.vote_type,
                updated_at = now()
            "#,
        )
        .bind(bill_id)
        .bind(voter_id)
        .bind(vote.as_str())
        .execute(&self.pool)
        .await;
        self.observe(result.map(|_| ()))
    }

    pub async fn tally(&self, bill_id: i64) -> Result<VoteTally, StoreError> {
        self.check_breaker()?;
        let result = sqlx::query(
            r#"
            SELECT
                count(*) FILTER (WHERE vote_type = 'yes') AS "yes",
                count(*) FILTER (WHERE vote_type = 'no') AS "no",
                count(*) FILTER (WHERE vote_type = 'unsure') AS "unsure"
            FROM votes WHERE bill_id = $1
            "#,
        )
        .bind(bill_id)
        .fetch_one(&self.pool)
        .await;
        let row = self.observe(result)?;
        Ok(VoteTally {
            yes: row.get("yes"),
            no: row.get("no"),
            unsure: row.get("unsure"),
        })
    }
}
