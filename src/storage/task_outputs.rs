use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::debug;

use super::StorageError;
use crate::crew::TaskOutput;
use crate::task::Inputs;

/// One row of the latest kickoff's task output log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTaskOutput {
    pub task_index: i64,
    pub task_id: String,
    pub expected_output: String,
    pub output: TaskOutput,
    pub inputs: Inputs,
    pub was_replayed: bool,
    pub timestamp: DateTime<Utc>,
}

/// SQLite log of the task outputs of the latest kickoff, used by replay
#[derive(Debug, Clone)]
pub struct KickoffTaskOutputsStorage {
    pool: SqlitePool,
}

type Row = (i64, String, String, String, String, bool, DateTime<Utc>);

impl KickoffTaskOutputsStorage {
    pub async fn open(database_path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS latest_kickoff_task_outputs (
                task_index INTEGER PRIMARY KEY,
                task_id TEXT NOT NULL,
                expected_output TEXT NOT NULL,
                output TEXT NOT NULL,
                inputs TEXT NOT NULL,
                was_replayed BOOLEAN NOT NULL DEFAULT 0,
                timestamp DATETIME NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        debug!(path = %database_path.display(), "opened task output log");
        Ok(Self { pool })
    }

    /// Drop every row; called at the start of each kickoff
    pub async fn reset(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM latest_kickoff_task_outputs")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    pub async fn upsert(
        &self,
        task_index: usize,
        output: &TaskOutput,
        inputs: &Inputs,
        was_replayed: bool,
    ) -> Result<(), StorageError> {
        let output_json = serde_json::to_string(output)?;
        let inputs_json = serde_json::to_string(inputs)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO latest_kickoff_task_outputs
            (task_index, task_id, expected_output, output, inputs, was_replayed, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task_index as i64)
        .bind(&output.task_id)
        .bind(&output.expected_output)
        .bind(output_json)
        .bind(inputs_json)
        .bind(was_replayed)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// All rows ordered by task index
    pub async fn load(&self) -> Result<Vec<StoredTaskOutput>, StorageError> {
        let rows = sqlx::query_as::<_, Row>(
            "SELECT task_index, task_id, expected_output, output, inputs, was_replayed, timestamp
             FROM latest_kickoff_task_outputs ORDER BY task_index ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .map(
                |(task_index, task_id, expected_output, output, inputs, was_replayed, timestamp)| {
                    Ok(StoredTaskOutput {
                        task_index,
                        task_id,
                        expected_output,
                        output: serde_json::from_str(&output)?,
                        inputs: serde_json::from_str(&inputs)?,
                        was_replayed,
                        timestamp,
                    })
                },
            )
            .collect()
    }
}
