// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roster_provisioning_core::{EventId, IdentityId, LifecycleEventType};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::error::{DbError, Result};
use crate::time::{format_ts, parse_ts};

/// An event about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLifecycleEvent {
	pub subject_id: IdentityId,
	pub event_type: LifecycleEventType,
	pub email_snapshot: Option<String>,
	pub metadata: serde_json::Value,
}

impl NewLifecycleEvent {
	pub fn new(subject_id: IdentityId, event_type: LifecycleEventType) -> Self {
		Self {
			subject_id,
			event_type,
			email_snapshot: None,
			metadata: serde_json::Value::Object(Default::default()),
		}
	}

	pub fn with_email_snapshot(mut self, email: Option<String>) -> Self {
		self.email_snapshot = email;
		self
	}

	pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
		self.metadata = metadata;
		self
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
	pub id: EventId,
	pub subject_id: IdentityId,
	pub event_type: LifecycleEventType,
	pub email_snapshot: Option<String>,
	pub metadata: serde_json::Value,
	pub created_at: DateTime<Utc>,
}

/// Append-only storage for lifecycle events.
#[async_trait]
pub trait LifecycleEventStore: Send + Sync {
	async fn append(&self, event: &NewLifecycleEvent) -> Result<EventId>;
}

type EventRow = (String, String, String, Option<String>, String, String);

#[derive(Clone)]
pub struct LifecycleEventRepository {
	pool: SqlitePool,
}

impl LifecycleEventRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, event), fields(subject_id = %event.subject_id, event_type = %event.event_type))]
	pub async fn append(&self, event: &NewLifecycleEvent) -> Result<EventId> {
		let id = EventId::generate();
		sqlx::query(
			r#"
			INSERT INTO lifecycle_events (id, subject_id, event_type, email_snapshot, metadata, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(id.to_string())
		.bind(event.subject_id.to_string())
		.bind(event.event_type.as_str())
		.bind(&event.email_snapshot)
		.bind(event.metadata.to_string())
		.bind(format_ts(Utc::now()))
		.execute(&self.pool)
		.await?;

		Ok(id)
	}

	/// Events for one subject in insertion order.
	#[tracing::instrument(skip(self))]
	pub async fn list_for_subject(&self, subject_id: IdentityId) -> Result<Vec<LifecycleEvent>> {
		let rows = sqlx::query_as::<_, EventRow>(
			r#"
			SELECT id, subject_id, event_type, email_snapshot, metadata, created_at
			FROM lifecycle_events
			WHERE subject_id = ?
			ORDER BY created_at, rowid
			"#,
		)
		.bind(subject_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(event_from_row).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_by_type(&self, event_type: LifecycleEventType) -> Result<i64> {
		let (count,): (i64,) =
			sqlx::query_as("SELECT COUNT(*) FROM lifecycle_events WHERE event_type = ?")
				.bind(event_type.as_str())
				.fetch_one(&self.pool)
				.await?;
		Ok(count)
	}

	/// Event counts keyed by subject id.
	#[tracing::instrument(skip(self))]
	pub async fn counts_by_subject(&self) -> Result<HashMap<String, i64>> {
		let rows: Vec<(String, i64)> = sqlx::query_as(
			"SELECT subject_id, COUNT(*) FROM lifecycle_events GROUP BY subject_id",
		)
		.fetch_all(&self.pool)
		.await?;
		Ok(rows.into_iter().collect())
	}

	/// Event counts keyed by lowercased email snapshot.
	#[tracing::instrument(skip(self))]
	pub async fn counts_by_email(&self) -> Result<HashMap<String, i64>> {
		let rows: Vec<(String, i64)> = sqlx::query_as(
			r#"
			SELECT LOWER(email_snapshot), COUNT(*)
			FROM lifecycle_events
			WHERE email_snapshot IS NOT NULL AND email_snapshot <> ''
			GROUP BY LOWER(email_snapshot)
			"#,
		)
		.fetch_all(&self.pool)
		.await?;
		Ok(rows.into_iter().collect())
	}
}

#[async_trait]
impl LifecycleEventStore for LifecycleEventRepository {
	async fn append(&self, event: &NewLifecycleEvent) -> Result<EventId> {
		self.append(event).await
	}
}

fn event_from_row(
	(id, subject_id, event_type, email_snapshot, metadata, created_at): EventRow,
) -> Result<LifecycleEvent> {
	Ok(LifecycleEvent {
		id: id
			.parse()
			.map_err(|e| DbError::Internal(format!("invalid event id '{id}': {e}")))?,
		subject_id: subject_id
			.parse()
			.map_err(|e| DbError::Internal(format!("invalid subject id '{subject_id}': {e}")))?,
		event_type: event_type.parse().map_err(DbError::Internal)?,
		email_snapshot,
		metadata: serde_json::from_str(&metadata)?,
		created_at: parse_ts(&created_at)?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use serde_json::json;

	#[tokio::test]
	async fn append_keeps_duplicates_in_order() {
		let repo = LifecycleEventRepository::new(create_test_pool().await);
		let subject = IdentityId::generate();

		let created = NewLifecycleEvent::new(subject, LifecycleEventType::IdentityCreated)
			.with_email_snapshot(Some("a@x.com".to_string()));
		repo.append(&created).await.unwrap();
		repo.append(&created).await.unwrap();
		repo.append(
			&NewLifecycleEvent::new(subject, LifecycleEventType::ProfileBootstrapOk)
				.with_metadata(json!({"outcome": "created"})),
		)
		.await
		.unwrap();

		let events = repo.list_for_subject(subject).await.unwrap();
		let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
		assert_eq!(
			types,
			vec![
				LifecycleEventType::IdentityCreated,
				LifecycleEventType::IdentityCreated,
				LifecycleEventType::ProfileBootstrapOk,
			]
		);
		assert_eq!(events[2].metadata["outcome"], "created");
		assert_eq!(
			repo.count_by_type(LifecycleEventType::IdentityCreated)
				.await
				.unwrap(),
			2
		);
	}

	#[tokio::test]
	async fn counts_group_by_subject_and_email() {
		let repo = LifecycleEventRepository::new(create_test_pool().await);
		let a = IdentityId::generate();
		let b = IdentityId::generate();
		repo.append(
			&NewLifecycleEvent::new(a, LifecycleEventType::IdentityCreated)
				.with_email_snapshot(Some("Jane@Example.com".to_string())),
		)
		.await
		.unwrap();
		repo.append(&NewLifecycleEvent::new(b, LifecycleEventType::IdentityCreated))
			.await
			.unwrap();

		let by_subject = repo.counts_by_subject().await.unwrap();
		assert_eq!(by_subject.get(&a.to_string()), Some(&1));
		assert_eq!(by_subject.get(&b.to_string()), Some(&1));

		let by_email = repo.counts_by_email().await.unwrap();
		assert_eq!(by_email.get("jane@example.com"), Some(&1));
		assert_eq!(by_email.len(), 1);
	}
}
