// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use roster_provisioning_core::{IdentityId, IdentityRecord};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

use crate::error::{DbError, Result};
use crate::time::{format_ts, parse_ts};

type IdentityRow = (String, Option<String>, Option<String>, String, String);

/// Position in the oldest-first scan of identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityCursor {
	pub created_at: DateTime<Utc>,
	pub id: IdentityId,
}

impl From<&IdentityRecord> for IdentityCursor {
	fn from(identity: &IdentityRecord) -> Self {
		Self {
			created_at: identity.created_at,
			id: identity.id,
		}
	}
}

/// Reads the provider-owned `identities` table.
#[derive(Clone)]
pub struct IdentityRepository {
	pool: SqlitePool,
}

impl IdentityRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Store an identity as the provider would. Returns false if the id already existed.
	///
	/// Provisioning never calls this; it exists for the ingest command and fixtures.
	#[tracing::instrument(skip(self, identity), fields(subject_id = %identity.id))]
	pub async fn record(&self, identity: &IdentityRecord) -> Result<bool> {
		let metadata = serde_json::to_string(&identity.metadata)?;
		let result = sqlx::query(
			r#"
			INSERT INTO identities (id, email, phone, metadata, created_at)
			VALUES (?, ?, ?, ?, ?)
			ON CONFLICT(id) DO NOTHING
			"#,
		)
		.bind(identity.id.to_string())
		.bind(&identity.email)
		.bind(&identity.phone)
		.bind(metadata)
		.bind(format_ts(identity.created_at))
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() == 1)
	}

	#[tracing::instrument(skip(self))]
	pub async fn get(&self, id: IdentityId) -> Result<Option<IdentityRecord>> {
		let row = sqlx::query_as::<_, IdentityRow>(
			"SELECT id, email, phone, metadata, created_at FROM identities WHERE id = ?",
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(identity_from_row).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_all(&self) -> Result<Vec<IdentityRecord>> {
		let rows = sqlx::query_as::<_, IdentityRow>(
			"SELECT id, email, phone, metadata, created_at FROM identities ORDER BY created_at, id",
		)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(identity_from_row).collect()
	}

	/// Identities with no profile, oldest first, strictly after `after`.
	#[tracing::instrument(skip(self))]
	pub async fn list_missing_profiles(
		&self,
		after: Option<IdentityCursor>,
		limit: u32,
	) -> Result<Vec<IdentityRecord>> {
		let (after_ts, after_id) = match after {
			Some(cursor) => (format_ts(cursor.created_at), cursor.id.to_string()),
			None => (String::new(), String::new()),
		};

		let rows = sqlx::query_as::<_, IdentityRow>(
			r#"
			SELECT i.id, i.email, i.phone, i.metadata, i.created_at
			FROM identities i
			LEFT JOIN profiles p ON p.id = i.id
			WHERE p.id IS NULL
			  AND (i.created_at > ? OR (i.created_at = ? AND i.id > ?))
			ORDER BY i.created_at, i.id
			LIMIT ?
			"#,
		)
		.bind(&after_ts)
		.bind(&after_ts)
		.bind(&after_id)
		.bind(limit as i64)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(identity_from_row).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_missing_profiles(&self) -> Result<i64> {
		let (count,): (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*)
			FROM identities i
			LEFT JOIN profiles p ON p.id = i.id
			WHERE p.id IS NULL
			"#,
		)
		.fetch_one(&self.pool)
		.await?;

		Ok(count)
	}
}

fn identity_from_row(
	(id, email, phone, metadata, created_at): IdentityRow,
) -> Result<IdentityRecord> {
	let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata)?;
	Ok(IdentityRecord {
		id: id
			.parse()
			.map_err(|e| DbError::Internal(format!("invalid identity id '{id}': {e}")))?,
		email,
		phone,
		metadata,
		created_at: parse_ts(&created_at)?,
	})
}
