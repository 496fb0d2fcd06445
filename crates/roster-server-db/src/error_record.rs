// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Captured provisioning failures awaiting operator triage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roster_provisioning_core::{ErrorRecordId, IdentityId};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{DbError, Result};
use crate::time::{format_ts, parse_opt_ts, parse_ts};

#[derive(Debug, Clone, PartialEq)]
pub struct NewErrorRecord {
	pub subject_id: Option<IdentityId>,
	pub message: String,
	pub detail: String,
	pub context: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
	pub id: ErrorRecordId,
	pub subject_id: Option<IdentityId>,
	pub message: String,
	pub detail: String,
	pub context: serde_json::Value,
	pub created_at: DateTime<Utc>,
	pub resolved: bool,
	pub resolved_by: Option<String>,
	pub resolved_at: Option<DateTime<Utc>>,
	pub notes: Option<String>,
}

#[async_trait]
pub trait ErrorRecordStore: Send + Sync {
	async fn insert(&self, record: &NewErrorRecord) -> Result<ErrorRecordId>;
}

type ErrorRow = (
	String,
	Option<String>,
	String,
	String,
	String,
	String,
	bool,
	Option<String>,
	Option<String>,
	Option<String>,
);

const ERROR_COLUMNS: &str = "id, subject_id, message, detail, context, created_at, \
	 resolved, resolved_by, resolved_at, notes";

#[derive(Clone)]
pub struct ErrorRecordRepository {
	pool: SqlitePool,
}

impl ErrorRecordRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, record), fields(subject_id = ?record.subject_id))]
	pub async fn insert(&self, record: &NewErrorRecord) -> Result<ErrorRecordId> {
		let id = ErrorRecordId::generate();
		sqlx::query(
			r#"
			INSERT INTO provisioning_errors (id, subject_id, message, detail, context, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(id.to_string())
		.bind(record.subject_id.map(|s| s.to_string()))
		.bind(&record.message)
		.bind(&record.detail)
		.bind(record.context.to_string())
		.bind(format_ts(Utc::now()))
		.execute(&self.pool)
		.await?;

		Ok(id)
	}

	#[tracing::instrument(skip(self))]
	pub async fn get(&self, id: ErrorRecordId) -> Result<Option<ErrorRecord>> {
		let sql = format!("SELECT {ERROR_COLUMNS} FROM provisioning_errors WHERE id = ?");
		let row = sqlx::query_as::<_, ErrorRow>(&sql)
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.map(error_from_row).transpose()
	}

	/// Newest first.
	#[tracing::instrument(skip(self))]
	pub async fn list(&self, unresolved_only: bool, limit: u32) -> Result<Vec<ErrorRecord>> {
		let sql = format!(
			"SELECT {ERROR_COLUMNS} FROM provisioning_errors \
			 WHERE (? = 0 OR resolved = 0) \
			 ORDER BY created_at DESC, rowid DESC LIMIT ?"
		);
		let rows = sqlx::query_as::<_, ErrorRow>(&sql)
			.bind(unresolved_only)
			.bind(limit as i64)
			.fetch_all(&self.pool)
			.await?;

		rows.into_iter().map(error_from_row).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_for_subject(&self, subject_id: IdentityId) -> Result<Vec<ErrorRecord>> {
		let sql = format!(
			"SELECT {ERROR_COLUMNS} FROM provisioning_errors \
			 WHERE subject_id = ? ORDER BY created_at, rowid"
		);
		let rows = sqlx::query_as::<_, ErrorRow>(&sql)
			.bind(subject_id.to_string())
			.fetch_all(&self.pool)
			.await?;

		rows.into_iter().map(error_from_row).collect()
	}

	/// Mark a record resolved. A second resolution keeps the first resolver and notes.
	#[tracing::instrument(skip(self, notes))]
	pub async fn resolve(
		&self,
		id: ErrorRecordId,
		resolved_by: &str,
		notes: Option<&str>,
	) -> Result<ErrorRecord> {
		sqlx::query(
			r#"
			UPDATE provisioning_errors
			SET resolved = 1, resolved_by = ?, resolved_at = ?, notes = ?
			WHERE id = ? AND resolved = 0
			"#,
		)
		.bind(resolved_by)
		.bind(format_ts(Utc::now()))
		.bind(notes)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		self
			.get(id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("error record {id}")))
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_unresolved(&self) -> Result<i64> {
		let (count,): (i64,) =
			sqlx::query_as("SELECT COUNT(*) FROM provisioning_errors WHERE resolved = 0")
				.fetch_one(&self.pool)
				.await?;
		Ok(count)
	}
}

#[async_trait]
impl ErrorRecordStore for ErrorRecordRepository {
	async fn insert(&self, record: &NewErrorRecord) -> Result<ErrorRecordId> {
		self.insert(record).await
	}
}

fn error_from_row(
	(
		id,
		subject_id,
		message,
		detail,
		context,
		created_at,
		resolved,
		resolved_by,
		resolved_at,
		notes,
	): ErrorRow,
) -> Result<ErrorRecord> {
	let subject_id = subject_id
		.as_deref()
		.map(str::parse::<IdentityId>)
		.transpose()
		.map_err(|e| DbError::Internal(format!("invalid subject id: {e}")))?;

	Ok(ErrorRecord {
		id: id
			.parse()
			.map_err(|e| DbError::Internal(format!("invalid error record id '{id}': {e}")))?,
		subject_id,
		message,
		detail,
		context: serde_json::from_str(&context)?,
		created_at: parse_ts(&created_at)?,
		resolved,
		resolved_by,
		resolved_at: parse_opt_ts(resolved_at)?,
		notes,
	})
}
