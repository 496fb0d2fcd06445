// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use roster_provisioning_core::IdentityId;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::time::{format_ts, parse_ts};

/// One row of the identity provider's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrailEntry {
	pub id: Uuid,
	pub action: String,
	/// Actor label; blocked signups carry a marker such as `"jane@example.com [blocked]"`.
	pub actor: String,
	pub actor_id: Option<IdentityId>,
	/// Originating address or client, when the provider recorded one.
	pub source: Option<String>,
	pub created_at: DateTime<Utc>,
}

impl AuditTrailEntry {
	pub fn new(action: impl Into<String>, actor: impl Into<String>) -> Self {
		Self {
			id: Uuid::new_v4(),
			action: action.into(),
			actor: actor.into(),
			actor_id: None,
			source: None,
			created_at: Utc::now(),
		}
	}

	pub fn with_actor_id(mut self, actor_id: IdentityId) -> Self {
		self.actor_id = Some(actor_id);
		self
	}

	pub fn with_source(mut self, source: impl Into<String>) -> Self {
		self.source = Some(source.into());
		self
	}

	pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
		self.created_at = created_at;
		self
	}
}

type AuditRow = (String, String, String, Option<String>, Option<String>, String);

/// Reads the `auth_audit_log` table. Writes exist only to seed fixtures.
#[derive(Clone)]
pub struct AuditTrailRepository {
	pool: SqlitePool,
}

impl AuditTrailRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, entry), fields(action = %entry.action))]
	pub async fn record(&self, entry: &AuditTrailEntry) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO auth_audit_log (id, action, actor, actor_id, source, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(entry.id.to_string())
		.bind(&entry.action)
		.bind(&entry.actor)
		.bind(entry.actor_id.map(|id| id.to_string()))
		.bind(&entry.source)
		.bind(format_ts(entry.created_at))
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Entries whose actor contains `marker` (case-insensitive), oldest first.
	#[tracing::instrument(skip(self))]
	pub async fn list_marked(&self, marker: &str) -> Result<Vec<AuditTrailEntry>> {
		let rows = sqlx::query_as::<_, AuditRow>(
			r#"
			SELECT id, action, actor, actor_id, source, created_at
			FROM auth_audit_log
			WHERE instr(lower(actor), lower(?)) > 0
			ORDER BY created_at, id
			"#,
		)
		.bind(marker)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(entry_from_row).collect()
	}

	/// Entries at or after `since`, oldest first.
	#[tracing::instrument(skip(self))]
	pub async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditTrailEntry>> {
		let rows = sqlx::query_as::<_, AuditRow>(
			r#"
			SELECT id, action, actor, actor_id, source, created_at
			FROM auth_audit_log
			WHERE created_at >= ?
			ORDER BY created_at, id
			"#,
		)
		.bind(format_ts(since))
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(entry_from_row).collect()
	}
}

fn entry_from_row(
	(id, action, actor, actor_id, source, created_at): AuditRow,
) -> Result<AuditTrailEntry> {
	// Actor ids written by the provider are not guaranteed to be UUIDs.
	let actor_id = actor_id.as_deref().and_then(|s| s.parse().ok());

	Ok(AuditTrailEntry {
		id: Uuid::parse_str(&id)
			.map_err(|e| DbError::Internal(format!("invalid audit entry id '{id}': {e}")))?,
		action,
		actor,
		actor_id,
		source,
		created_at: parse_ts(&created_at)?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use chrono::Duration;

	#[tokio::test]
	async fn list_since_filters_by_window() {
		let repo = AuditTrailRepository::new(create_test_pool().await);
		let now = Utc::now();
		let old = AuditTrailEntry::new("user_signedup", "old@example.com")
			.with_created_at(now - Duration::hours(48));
		let recent = AuditTrailEntry::new("user_signedup", "new@example.com [blocked]")
			.with_source("10.0.0.1")
			.with_created_at(now - Duration::hours(1));
		repo.record(&old).await.unwrap();
		repo.record(&recent).await.unwrap();

		let entries = repo.list_since(now - Duration::hours(24)).await.unwrap();
		assert_eq!(entries, vec![recent]);
	}

	#[tokio::test]
	async fn list_marked_matches_marker_case_insensitively() {
		let repo = AuditTrailRepository::new(create_test_pool().await);
		let blocked = AuditTrailEntry::new("user_signedup", "jane@example.com [BLOCKED]");
		let clean = AuditTrailEntry::new("user_signedup", "john@example.com");
		repo.record(&blocked).await.unwrap();
		repo.record(&clean).await.unwrap();

		let entries = repo.list_marked("[blocked]").await.unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].id, blocked.id);
	}
}
