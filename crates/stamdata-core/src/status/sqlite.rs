use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::sync::Arc;

use super::{ImportStatus, ImportStatusRepository, Outcome, StatusError, StatusResult};
use crate::clock::{from_millis, to_millis, Clock};
use crate::record::is_identifier;

/// Status history in the table `<home>ImportStatus`
#[derive(Debug, Clone)]
pub struct SqliteImportStatusRepository {
    pool: SqlitePool,
    table: String,
    clock: Arc<dyn Clock>,
    max_days_between_runs: i64,
}

impl SqliteImportStatusRepository {
    pub fn new(
        pool: SqlitePool,
        home: &str,
        clock: Arc<dyn Clock>,
        max_days_between_runs: i64,
    ) -> StatusResult<Self> {
        if !is_identifier(home) {
            return Err(StatusError::InvalidHome(home.to_string()));
        }

        Ok(Self {
            pool,
            table: format!("{}ImportStatus", home),
            clock,
            max_days_between_runs,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn ensure_table(&self) -> StatusResult<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                StartTime INTEGER NOT NULL,
                EndTime INTEGER,
                Outcome TEXT
            )",
            self.table
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn end_latest(
        &self,
        conn: &mut SqliteConnection,
        end: DateTime<Utc>,
        outcome: Outcome,
    ) -> StatusResult<()> {
        let updated = sqlx::query(&format!(
            "UPDATE {table} SET EndTime = ?, Outcome = ?
             WHERE Id = (SELECT Id FROM {table} ORDER BY StartTime DESC, Id DESC LIMIT 1)",
            table = self.table
        ))
        .bind(to_millis(end))
        .bind(outcome.as_str())
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 0 {
            tracing::debug!(table = %self.table, %outcome, "No import recorded, nothing to end");
        }

        Ok(())
    }
}

#[async_trait]
impl ImportStatusRepository for SqliteImportStatusRepository {
    async fn import_started_at(
        &self,
        conn: &mut SqliteConnection,
        start: DateTime<Utc>,
    ) -> StatusResult<()> {
        sqlx::query(&format!("INSERT INTO {} (StartTime) VALUES (?)", self.table))
            .bind(to_millis(start))
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    async fn import_ended_with_success(
        &self,
        conn: &mut SqliteConnection,
        end: DateTime<Utc>,
    ) -> StatusResult<()> {
        self.end_latest(conn, end, Outcome::Success).await
    }

    async fn import_ended_with_failure(
        &self,
        conn: &mut SqliteConnection,
        end: DateTime<Utc>,
    ) -> StatusResult<()> {
        self.end_latest(conn, end, Outcome::Failure).await
    }

    async fn latest_status(&self) -> StatusResult<Option<ImportStatus>> {
        let row = sqlx::query(&format!(
            "SELECT StartTime, EndTime, Outcome FROM {} ORDER BY StartTime DESC, Id DESC LIMIT 1",
            self.table
        ))
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let outcome = row
            .try_get::<Option<String>, _>("Outcome")?
            .map(|s| s.parse::<Outcome>())
            .transpose()?;

        Ok(Some(ImportStatus {
            start_time: from_millis(row.try_get("StartTime")?),
            end_time: row.try_get::<Option<i64>, _>("EndTime")?.map(from_millis),
            outcome,
        }))
    }

    async fn is_overdue(&self) -> StatusResult<bool> {
        let Some(latest) = self.latest_status().await? else {
            return Ok(false);
        };

        // A threshold beyond the representable range is never reached
        let deadline = chrono::TimeDelta::try_days(self.max_days_between_runs)
            .and_then(|threshold| self.clock.now().checked_sub_signed(threshold));
        Ok(deadline.is_some_and(|deadline| deadline > latest.start_time))
    }

    async fn is_db_alive(&self) -> bool {
        let probe = format!("SELECT Id FROM {} LIMIT 1", self.table);
        match sqlx::query(&probe).fetch_optional(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(table = %self.table, error = %e, "Status table is not reachable");
                false
            }
        }
    }
}
