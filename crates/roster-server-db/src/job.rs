// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistence for scheduled job definitions and their run history.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;

use crate::error::{DbError, Result};
use crate::time::{format_ts, parse_opt_ts, parse_ts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Running,
	Succeeded,
	Failed,
	Cancelled,
}

impl JobStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			JobStatus::Running => "running",
			JobStatus::Succeeded => "succeeded",
			JobStatus::Failed => "failed",
			JobStatus::Cancelled => "cancelled",
		}
	}
}

impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for JobStatus {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"running" => Ok(JobStatus::Running),
			"succeeded" => Ok(JobStatus::Succeeded),
			"failed" => Ok(JobStatus::Failed),
			"cancelled" => Ok(JobStatus::Cancelled),
			_ => Err(format!("unknown job status: {s}")),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
	Schedule,
	Manual,
	Retry,
}

impl TriggerSource {
	pub fn as_str(&self) -> &'static str {
		match self {
			TriggerSource::Schedule => "schedule",
			TriggerSource::Manual => "manual",
			TriggerSource::Retry => "retry",
		}
	}
}

impl FromStr for TriggerSource {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"schedule" => Ok(TriggerSource::Schedule),
			"manual" => Ok(TriggerSource::Manual),
			"retry" => Ok(TriggerSource::Retry),
			_ => Err(format!("unknown trigger source: {s}")),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
	pub id: String,
	pub name: String,
	pub description: String,
	pub job_type: String,
	pub interval_secs: Option<i64>,
	pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
	pub id: String,
	pub job_id: String,
	pub status: JobStatus,
	pub started_at: DateTime<Utc>,
	pub completed_at: Option<DateTime<Utc>>,
	pub duration_ms: Option<i64>,
	pub error_message: Option<String>,
	pub retry_count: u32,
	pub triggered_by: TriggerSource,
	pub metadata: Option<serde_json::Value>,
}

type RunRow = (
	String,
	String,
	String,
	String,
	Option<String>,
	Option<i64>,
	Option<String>,
	i64,
	String,
	Option<String>,
);

const RUN_COLUMNS: &str = "id, job_id, status, started_at, completed_at, duration_ms, \
	 error_message, retry_count, triggered_by, metadata";

#[derive(Clone)]
pub struct JobRepository {
	pool: SqlitePool,
}

impl JobRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, def), fields(job_id = %def.id))]
	pub async fn upsert_definition(&self, def: &JobDefinition) -> Result<()> {
		let now = format_ts(Utc::now());
		sqlx::query(
			r#"
			INSERT INTO job_definitions (id, name, description, job_type, interval_secs, enabled, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				name = excluded.name,
				description = excluded.description,
				job_type = excluded.job_type,
				interval_secs = excluded.interval_secs,
				enabled = excluded.enabled,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(&def.id)
		.bind(&def.name)
		.bind(&def.description)
		.bind(&def.job_type)
		.bind(def.interval_secs)
		.bind(def.enabled)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_definitions(&self) -> Result<Vec<JobDefinition>> {
		let rows = sqlx::query_as::<_, (String, String, String, String, Option<i64>, bool)>(
			"SELECT id, name, description, job_type, interval_secs, enabled FROM job_definitions ORDER BY name",
		)
		.fetch_all(&self.pool)
		.await?;

		Ok(rows
			.into_iter()
			.map(
				|(id, name, description, job_type, interval_secs, enabled)| JobDefinition {
					id,
					name,
					description,
					job_type,
					interval_secs,
					enabled,
				},
			)
			.collect())
	}

	#[tracing::instrument(skip(self, run), fields(run_id = %run.id, job_id = %run.job_id))]
	pub async fn record_run_start(&self, run: &JobRun) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO job_runs (id, job_id, status, started_at, retry_count, triggered_by)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&run.id)
		.bind(&run.job_id)
		.bind(run.status.as_str())
		.bind(format_ts(run.started_at))
		.bind(run.retry_count as i64)
		.bind(run.triggered_by.as_str())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self, metadata))]
	pub async fn record_run_complete(
		&self,
		run_id: &str,
		status: JobStatus,
		retry_count: u32,
		error: Option<String>,
		metadata: Option<serde_json::Value>,
	) -> Result<()> {
		let (started_at,): (String,) =
			sqlx::query_as("SELECT started_at FROM job_runs WHERE id = ?")
				.bind(run_id)
				.fetch_optional(&self.pool)
				.await?
				.ok_or_else(|| DbError::NotFound(format!("job run {run_id}")))?;

		let now = Utc::now();
		let duration_ms = (now - parse_ts(&started_at)?).num_milliseconds();

		sqlx::query(
			r#"
			UPDATE job_runs
			SET status = ?, completed_at = ?, duration_ms = ?, retry_count = ?,
				error_message = ?, metadata = ?
			WHERE id = ?
			"#,
		)
		.bind(status.as_str())
		.bind(format_ts(now))
		.bind(duration_ms)
		.bind(retry_count as i64)
		.bind(error)
		.bind(metadata.map(|m| m.to_string()))
		.bind(run_id)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Most recent runs first.
	#[tracing::instrument(skip(self))]
	pub async fn list_runs(&self, job_id: &str, limit: u32) -> Result<Vec<JobRun>> {
		let sql = format!(
			"SELECT {RUN_COLUMNS} FROM job_runs WHERE job_id = ? ORDER BY started_at DESC LIMIT ?"
		);
		let rows = sqlx::query_as::<_, RunRow>(&sql)
			.bind(job_id)
			.bind(limit as i64)
			.fetch_all(&self.pool)
			.await?;

		rows.into_iter().map(run_from_row).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_last_run(&self, job_id: &str) -> Result<Option<JobRun>> {
		Ok(self.list_runs(job_id, 1).await?.into_iter().next())
	}

	/// Failed runs since the most recent non-failed run.
	#[tracing::instrument(skip(self))]
	pub async fn count_consecutive_failures(&self, job_id: &str) -> Result<u32> {
		let (count,): (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*)
			FROM job_runs
			WHERE job_id = ?
			  AND status = 'failed'
			  AND started_at > COALESCE(
				(SELECT MAX(started_at) FROM job_runs WHERE job_id = ? AND status <> 'failed'),
				''
			  )
			"#,
		)
		.bind(job_id)
		.bind(job_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(count as u32)
	}

	/// Delete completed runs older than the retention window.
	#[tracing::instrument(skip(self))]
	pub async fn cleanup_old_runs(&self, retention_days: u32) -> Result<u64> {
		let cutoff = Utc::now()
			.checked_sub_signed(Duration::days(i64::from(retention_days)))
			.unwrap_or(DateTime::<Utc>::MIN_UTC);
		let result =
			sqlx::query("DELETE FROM job_runs WHERE completed_at IS NOT NULL AND completed_at < ?")
				.bind(format_ts(cutoff))
				.execute(&self.pool)
				.await?;

		Ok(result.rows_affected())
	}
}

fn run_from_row(
	(
		id,
		job_id,
		status,
		started_at,
		completed_at,
		duration_ms,
		error_message,
		retry_count,
		triggered_by,
		metadata,
	): RunRow,
) -> Result<JobRun> {
	Ok(JobRun {
		id,
		job_id,
		status: status.parse().map_err(DbError::Internal)?,
		started_at: parse_ts(&started_at)?,
		completed_at: parse_opt_ts(completed_at)?,
		duration_ms,
		error_message,
		retry_count: retry_count as u32,
		triggered_by: triggered_by.parse().map_err(DbError::Internal)?,
		metadata: metadata
			.as_deref()
			.and_then(|s| serde_json::from_str(s).ok()),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	fn definition() -> JobDefinition {
		JobDefinition {
			id: "profile-reconciliation".to_string(),
			name: "Profile Reconciliation".to_string(),
			description: "Repairs identities without profiles".to_string(),
			job_type: "periodic".to_string(),
			interval_secs: Some(300),
			enabled: true,
		}
	}

	fn run(id: &str, started_at: DateTime<Utc>) -> JobRun {
		JobRun {
			id: id.to_string(),
			job_id: "profile-reconciliation".to_string(),
			status: JobStatus::Running,
			started_at,
			completed_at: None,
			duration_ms: None,
			error_message: None,
			retry_count: 0,
			triggered_by: TriggerSource::Schedule,
			metadata: None,
		}
	}

	async fn setup() -> JobRepository {
		let repo = JobRepository::new(create_test_pool().await);
		repo.upsert_definition(&definition()).await.unwrap();
		repo
	}

	#[tokio::test]
	async fn upsert_definition_overwrites() {
		let repo = setup().await;
		let updated = JobDefinition {
			enabled: false,
			..definition()
		};
		repo.upsert_definition(&updated).await.unwrap();

		assert_eq!(repo.list_definitions().await.unwrap(), vec![updated]);
	}

	#[tokio::test]
	async fn run_lifecycle_is_recorded() {
		let repo = setup().await;
		repo.record_run_start(&run("run-1", Utc::now())).await.unwrap();
		repo.record_run_complete(
			"run-1",
			JobStatus::Succeeded,
			1,
			None,
			Some(serde_json::json!({"repaired": 3})),
		)
		.await
		.unwrap();

		let last = repo
			.get_last_run("profile-reconciliation")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(last.status, JobStatus::Succeeded);
		assert_eq!(last.retry_count, 1);
		assert!(last.completed_at.is_some());
		assert!(last.duration_ms.unwrap() >= 0);
		assert_eq!(last.metadata.unwrap()["repaired"], 3);
	}

	#[tokio::test]
	async fn completing_unknown_run_is_not_found() {
		let repo = setup().await;
		let result = repo
			.record_run_complete("missing", JobStatus::Failed, 0, None, None)
			.await;
		assert!(matches!(result, Err(DbError::NotFound(_))));
	}

	#[tokio::test]
	async fn consecutive_failures_stop_at_last_success() {
		let repo = setup().await;
		let base = Utc::now() - Duration::minutes(10);
		let statuses = [
			JobStatus::Failed,
			JobStatus::Succeeded,
			JobStatus::Failed,
			JobStatus::Failed,
		];
		for (i, status) in statuses.iter().enumerate() {
			let id = format!("run-{i}");
			repo.record_run_start(&run(&id, base + Duration::minutes(i as i64)))
				.await
				.unwrap();
			repo.record_run_complete(&id, *status, 0, None, None)
				.await
				.unwrap();
		}

		assert_eq!(
			repo.count_consecutive_failures("profile-reconciliation")
				.await
				.unwrap(),
			2
		);
		assert_eq!(repo.count_consecutive_failures("other").await.unwrap(), 0);
	}

	#[tokio::test]
	async fn cleanup_keeps_recent_and_running() {
		let repo = setup().await;
		repo.record_run_start(&run("running", Utc::now())).await.unwrap();
		repo.record_run_start(&run("done", Utc::now())).await.unwrap();
		repo.record_run_complete("done", JobStatus::Succeeded, 0, None, None)
			.await
			.unwrap();

		assert_eq!(repo.cleanup_old_runs(30).await.unwrap(), 0);
		assert_eq!(repo.cleanup_old_runs(0).await.unwrap(), 1);
		assert_eq!(
			repo.list_runs("profile-reconciliation", 10)
				.await
				.unwrap()
				.len(),
			1
		);
	}

	#[tokio::test]
	async fn cleanup_with_unbounded_retention_deletes_nothing() {
		let repo = setup().await;
		repo.record_run_start(&run("done", Utc::now() - Duration::days(3650)))
			.await
			.unwrap();
		repo.record_run_complete("done", JobStatus::Succeeded, 0, None, None)
			.await
			.unwrap();

		assert_eq!(repo.cleanup_old_runs(u32::MAX).await.unwrap(), 0);
		assert_eq!(
			repo.list_runs("profile-reconciliation", 10)
				.await
				.unwrap()
				.len(),
			1
		);
	}
}
