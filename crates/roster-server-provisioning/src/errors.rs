// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error capture and operator triage.

use roster_provisioning_core::{ErrorRecordId, IdentityId, LifecycleEventType};
use roster_server_db::{ErrorRecord, ErrorRecordRepository, ErrorRecordStore, NewErrorRecord};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ProvisioningError, Result};
use crate::ledger::EventLedger;

/// Persists provisioning failures. Never fails the caller.
#[derive(Clone)]
pub struct ErrorCapture {
	store: Arc<dyn ErrorRecordStore>,
	ledger: EventLedger,
}

impl ErrorCapture {
	pub fn new(store: Arc<dyn ErrorRecordStore>, ledger: EventLedger) -> Self {
		Self { store, ledger }
	}

	/// Store one error record.
	///
	/// Returns `None` when the record could not be written; that loss is reported once
	/// through the ledger (`error_capture_failed`) and once through `warn!`.
	#[tracing::instrument(skip(self, detail, context), fields(subject_id = ?subject_id))]
	pub async fn record(
		&self,
		subject_id: Option<IdentityId>,
		message: &str,
		detail: &str,
		context: serde_json::Value,
	) -> Option<ErrorRecordId> {
		let record = NewErrorRecord {
			subject_id,
			message: message.to_string(),
			detail: detail.to_string(),
			context,
		};

		match self.store.insert(&record).await {
			Ok(id) => Some(id),
			Err(e) => {
				warn!(
					subject_id = ?subject_id,
					summary = message,
					error = %e,
					"failed to persist provisioning error record"
				);
				if let Some(subject_id) = subject_id {
					self
						.ledger
						.append(
							subject_id,
							LifecycleEventType::ErrorCaptureFailed,
							None,
							json!({
								"message": message,
								"capture_error": e.to_string(),
							}),
						)
						.await;
				}
				None
			}
		}
	}
}

/// Operator workflow over captured errors.
#[derive(Clone)]
pub struct ErrorTriage {
	repository: ErrorRecordRepository,
}

impl ErrorTriage {
	pub fn new(repository: ErrorRecordRepository) -> Self {
		Self { repository }
	}

	pub async fn list(&self, unresolved_only: bool, limit: u32) -> Result<Vec<ErrorRecord>> {
		Ok(self.repository.list(unresolved_only, limit).await?)
	}

	pub async fn get(&self, id: ErrorRecordId) -> Result<ErrorRecord> {
		self
			.repository
			.get(id)
			.await?
			.ok_or_else(|| ProvisioningError::NotFound(format!("error record {id}")))
	}

	pub async fn count_unresolved(&self) -> Result<i64> {
		Ok(self.repository.count_unresolved().await?)
	}

	/// Mark a record resolved. Resolving twice keeps the first resolver.
	#[tracing::instrument(skip(self, notes))]
	pub async fn resolve(
		&self,
		id: ErrorRecordId,
		resolved_by: &str,
		notes: Option<&str>,
	) -> Result<ErrorRecord> {
		let record = self
			.repository
			.resolve(id, resolved_by, notes)
			.await
			.map_err(|e| match e {
				roster_server_db::DbError::NotFound(what) => ProvisioningError::NotFound(what),
				other => ProvisioningError::Database(other),
			})?;

		info!(
			error_id = %id,
			resolved_by = record.resolved_by.as_deref().unwrap_or_default(),
			"provisioning error resolved"
		);
		Ok(record)
	}
}
