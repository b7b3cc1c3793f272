use crate::DbError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use sqlx::SqlitePool;
use uuid::Uuid;

/// One instrument's statistics as they are stored. `None` is an undefined
/// metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsRecord {
    pub date: NaiveDate,
    pub instrument: String,
    pub sharpe: Option<f64>,
    pub drawdown: Option<f64>,
    pub volatility: Option<f64>,
}

/// One point of the normalized portfolio/benchmark chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub benchmark_id: String,
    pub portfolio_value: f64,
    pub benchmark_value: f64,
}

/// Everything one analysis run appends. Written atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotBatch {
    pub run_id: Uuid,
    pub analytics: Vec<AnalyticsRecord>,
    pub portfolio: Vec<PortfolioSnapshot>,
}

impl SnapshotBatch {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            analytics: Vec::new(),
            portfolio: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.analytics.is_empty() && self.portfolio.is_empty()
    }
}

/// A row read back from the `analytics` table.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct StoredAnalytics {
    pub id: i64,
    pub run_id: String,
    pub date: NaiveDate,
    pub instrument: String,
    pub sharpe: Option<f64>,
    pub drawdown: Option<f64>,
    pub volatility: Option<f64>,
}

/// A row read back from the `portfolio_snapshots` table.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct StoredSnapshot {
    pub id: i64,
    pub run_id: String,
    pub date: NaiveDate,
    pub benchmark_id: String,
    pub portfolio_value: f64,
    pub benchmark_value: f64,
}

/// An append-only destination for analysis results.
///
/// Implementations must write a batch all-or-nothing so that concurrent
/// writers never interleave partial records.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn append(&self, batch: &SnapshotBatch) -> Result<(), DbError>;
}

/// The `DbRepository` is the explicit handle to the snapshot database. It is
/// built by the caller and passed to whatever needs to read or write.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: SqlitePool,
}

impl DbRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetches stored per-instrument statistics, oldest first.
    pub async fn fetch_analytics_history(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<StoredAnalytics>, DbError> {
        let rows = sqlx::query_as::<_, StoredAnalytics>(
            r#"
            SELECT id, run_id, date, instrument, sharpe, drawdown, volatility
            FROM analytics
            ORDER BY id ASC
            LIMIT ?
            "#,
        )
        // SQLite treats a negative LIMIT as no limit.
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Fetches the chart points appended by one run, in date order.
    pub async fn fetch_portfolio_snapshots(
        &self,
        run_id: Uuid,
    ) -> Result<Vec<StoredSnapshot>, DbError> {
        let rows = sqlx::query_as::<_, StoredSnapshot>(
            r#"
            SELECT id, run_id, date, benchmark_id, portfolio_value, benchmark_value
            FROM portfolio_snapshots
            WHERE run_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(run_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl SnapshotSink for DbRepository {
    async fn append(&self, batch: &SnapshotBatch) -> Result<(), DbError> {
        if batch.is_empty() {
            return Ok(());
        }
        let run_id = batch.run_id.to_string();
        let mut tx = self.pool.begin().await?;

        for record in &batch.analytics {
            sqlx::query(
                r#"
                INSERT INTO analytics (run_id, date, instrument, sharpe, drawdown, volatility)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&run_id)
            .bind(record.date)
            .bind(&record.instrument)
            .bind(record.sharpe)
            .bind(record.drawdown)
            .bind(record.volatility)
            .execute(&mut *tx)
            .await?;
        }

        for point in &batch.portfolio {
            sqlx::query(
                r#"
                INSERT INTO portfolio_snapshots (run_id, date, benchmark_id, portfolio_value, benchmark_value)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&run_id)
            .bind(point.date)
            .bind(&point.benchmark_id)
            .bind(point.portfolio_value)
            .bind(point.benchmark_value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            run_id = %batch.run_id,
            analytics = batch.analytics.len(),
            snapshots = batch.portfolio.len(),
            "Appended snapshot batch."
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_to, run_migrations};

    async fn repository() -> DbRepository {
        let pool = connect_to("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        DbRepository::new(pool)
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn batch() -> SnapshotBatch {
        let mut batch = SnapshotBatch::new(Uuid::new_v4());
        batch.analytics.push(AnalyticsRecord {
            date: date(3),
            instrument: "SPY".to_string(),
            sharpe: Some(1.25),
            drawdown: Some(-0.1),
            volatility: Some(0.18),
        });
        batch.analytics.push(AnalyticsRecord {
            date: date(3),
            instrument: "FLAT".to_string(),
            sharpe: None,
            drawdown: Some(0.0),
            volatility: Some(0.0),
        });
        batch.portfolio.push(PortfolioSnapshot {
            date: date(1),
            benchmark_id: "SPY".to_string(),
            portfolio_value: 100.0,
            benchmark_value: 100.0,
        });
        batch.portfolio.push(PortfolioSnapshot {
            date: date(2),
            benchmark_id: "SPY".to_string(),
            portfolio_value: 101.5,
            benchmark_value: 100.7,
        });
        batch
    }

    #[tokio::test]
    async fn appended_rows_read_back_in_order() {
        let repo = repository().await;
        let batch = batch();
        repo.append(&batch).await.unwrap();

        let history = repo.fetch_analytics_history(None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].instrument, "SPY");
        assert_eq!(history[0].sharpe, Some(1.25));
        assert_eq!(history[0].run_id, batch.run_id.to_string());
        assert_eq!(history[1].sharpe, None);

        let snapshots = repo.fetch_portfolio_snapshots(batch.run_id).await.unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].date, date(2));
        assert_eq!(snapshots[1].portfolio_value, 101.5);
    }

    #[tokio::test]
    async fn history_honors_the_limit() {
        let repo = repository().await;
        repo.append(&batch()).await.unwrap();
        repo.append(&batch()).await.unwrap();

        assert_eq!(repo.fetch_analytics_history(None).await.unwrap().len(), 4);
        assert_eq!(repo.fetch_analytics_history(Some(3)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_batches_write_nothing() {
        let repo = repository().await;
        repo.append(&SnapshotBatch::new(Uuid::new_v4())).await.unwrap();
        assert!(repo.fetch_analytics_history(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_batches_are_not_interleaved() {
        let repo = repository().await;
        let (a, b) = (batch(), batch());
        let (ra, rb) = tokio::join!(repo.append(&a), repo.append(&b));
        ra.unwrap();
        rb.unwrap();

        let history = repo.fetch_analytics_history(None).await.unwrap();
        let runs: Vec<&str> = history.iter().map(|r| r.run_id.as_str()).collect();
        assert_eq!(runs.len(), 4);
        assert_eq!(runs[0], runs[1]);
        assert_eq!(runs[2], runs[3]);
        assert_ne!(runs[1], runs[2]);
    }
}
