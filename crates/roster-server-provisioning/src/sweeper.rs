// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic reconciliation of identities that have no profile.
//!
//! The sweeper walks `identities LEFT JOIN profiles` oldest first using a keyset cursor,
//! so a subject that fails is not read again in the same run. Every subject is handled
//! in isolation: one failure never aborts the run. Cancellation is checked between
//! subjects and completed repairs are kept, so an interrupted run is simply resumed by
//! the next one.

use roster_provisioning_core::{
	extract_profile_draft, ErrorRecordId, IdentityId, IdentityRecord, LifecycleEventType,
	MergeOutcome,
};
use roster_server_config::SweeperConfig;
use roster_server_db::{IdentityCursor, IdentityRepository};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::Result;
use crate::errors::ErrorCapture;
use crate::hook::draft_summary;
use crate::ledger::EventLedger;
use crate::merge::ProfileMerger;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SweepOutcome {
	Repaired {
		outcome: MergeOutcome,
	},
	Failed {
		message: String,
		error_id: Option<ErrorRecordId>,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
	pub subject_id: IdentityId,
	#[serde(flatten)]
	pub outcome: SweepOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepRun {
	pub reports: Vec<SweepReport>,
	/// True when the run stopped early because cancellation was requested.
	pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
	pub visited: usize,
	pub created: usize,
	pub enriched: usize,
	pub unchanged: usize,
	pub failed: usize,
	pub cancelled: bool,
}

impl SweepRun {
	pub fn summary(&self) -> SweepSummary {
		let mut summary = SweepSummary {
			visited: self.reports.len(),
			cancelled: self.cancelled,
			..Default::default()
		};
		for report in &self.reports {
			match report.outcome {
				SweepOutcome::Repaired {
					outcome: MergeOutcome::Created,
				} => summary.created += 1,
				SweepOutcome::Repaired {
					outcome: MergeOutcome::Enriched,
				} => summary.enriched += 1,
				SweepOutcome::Repaired {
					outcome: MergeOutcome::Unchanged,
				} => summary.unchanged += 1,
				SweepOutcome::Failed { .. } => summary.failed += 1,
			}
		}
		summary
	}
}

#[derive(Clone)]
pub struct ReconciliationSweeper {
	identities: IdentityRepository,
	merger: ProfileMerger,
	ledger: EventLedger,
	errors: ErrorCapture,
	config: SweeperConfig,
}

impl ReconciliationSweeper {
	pub fn new(
		identities: IdentityRepository,
		merger: ProfileMerger,
		ledger: EventLedger,
		errors: ErrorCapture,
		config: SweeperConfig,
	) -> Self {
		Self {
			identities,
			merger,
			ledger,
			errors,
			config,
		}
	}

	/// Run one sweep.
	///
	/// Only a failure to read the identity scan itself is returned as an error;
	/// per-subject failures are reported in the run.
	#[tracing::instrument(skip(self, is_cancelled))]
	pub async fn run(&self, is_cancelled: impl Fn() -> bool) -> Result<SweepRun> {
		let max_subjects = self.config.max_subjects_per_run as usize;
		let batch_size = self.config.batch_size.max(1) as usize;
		let mut run = SweepRun::default();
		let mut cursor: Option<IdentityCursor> = None;

		'pages: while run.reports.len() < max_subjects {
			let limit = batch_size.min(max_subjects - run.reports.len());
			let page = self
				.identities
				.list_missing_profiles(cursor, limit as u32)
				.await?;

			for identity in &page {
				if is_cancelled() {
					run.cancelled = true;
					break 'pages;
				}
				cursor = Some(IdentityCursor::from(identity));
				run.reports.push(self.reconcile(identity).await);
			}

			if page.len() < limit {
				break;
			}
		}

		let summary = run.summary();
		info!(
			visited = summary.visited,
			created = summary.created,
			enriched = summary.enriched,
			failed = summary.failed,
			cancelled = summary.cancelled,
			"reconciliation sweep finished"
		);
		Ok(run)
	}

	#[tracing::instrument(skip(self, identity), fields(subject_id = %identity.id))]
	async fn reconcile(&self, identity: &IdentityRecord) -> SweepReport {
		let draft = extract_profile_draft(identity);
		let email = draft.email.as_deref();

		let outcome = match self.merger.ensure_profile(&draft).await {
			Ok(outcome) => {
				self
					.ledger
					.append(
						identity.id,
						LifecycleEventType::ReconciliationRepaired,
						email,
						json!({ "outcome": outcome.as_str() }),
					)
					.await;
				SweepOutcome::Repaired { outcome }
			}
			Err(e) => {
				warn!(error = %e, kind = e.kind(), "reconciliation failed for subject");
				let message = e.to_string();
				let error_id = self
					.errors
					.record(
						Some(identity.id),
						"profile reconciliation failed",
						&message,
						json!({
							"stage": "sweeper",
							"error_kind": e.kind(),
							"draft": draft_summary(&draft),
						}),
					)
					.await;
				self
					.ledger
					.append(
						identity.id,
						LifecycleEventType::ReconciliationFailed,
						email,
						json!({
							"error_kind": e.kind(),
							"error_id": error_id.map(|id| id.to_string()),
						}),
					)
					.await;
				SweepOutcome::Failed { message, error_id }
			}
		};

		SweepReport {
			subject_id: identity.id,
			outcome,
		}
	}
}
