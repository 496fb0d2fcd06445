// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort lifecycle ledger.

use roster_provisioning_core::{IdentityId, LifecycleEventType};
use roster_server_db::{LifecycleEventStore, NewLifecycleEvent};
use std::sync::Arc;
use tracing::warn;

/// Appends lifecycle events without ever failing the caller.
///
/// A failed write is dropped and surfaces only as a `warn!` carrying the subject and
/// event type.
#[derive(Clone)]
pub struct EventLedger {
	store: Arc<dyn LifecycleEventStore>,
}

impl EventLedger {
	pub fn new(store: Arc<dyn LifecycleEventStore>) -> Self {
		Self { store }
	}

	#[tracing::instrument(skip(self, email_snapshot, metadata), fields(subject_id = %subject_id, event_type = %event_type))]
	pub async fn append(
		&self,
		subject_id: IdentityId,
		event_type: LifecycleEventType,
		email_snapshot: Option<&str>,
		metadata: serde_json::Value,
	) {
		let event = NewLifecycleEvent::new(subject_id, event_type)
			.with_email_snapshot(email_snapshot.map(str::to_string))
			.with_metadata(metadata);

		if let Err(e) = self.store.append(&event).await {
			warn!(
				subject_id = %subject_id,
				event_type = %event_type,
				error = %e,
				"failed to append lifecycle event"
			);
		}
	}
}
