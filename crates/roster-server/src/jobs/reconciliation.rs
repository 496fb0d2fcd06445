// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use roster_server_jobs::{Job, JobContext, JobError, JobOutput};
use roster_server_provisioning::ReconciliationSweeper;

/// Periodic profile reconciliation.
pub struct ReconciliationJob {
	sweeper: ReconciliationSweeper,
}

impl ReconciliationJob {
	pub fn new(sweeper: ReconciliationSweeper) -> Self {
		Self { sweeper }
	}
}

#[async_trait]
impl Job for ReconciliationJob {
	fn id(&self) -> &str {
		"profile-reconciliation"
	}

	fn name(&self) -> &str {
		"Profile Reconciliation"
	}

	fn description(&self) -> &str {
		"Creates missing profiles for identities the provisioning hook did not cover"
	}

	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		if ctx.cancellation_token.is_cancelled() {
			return Err(JobError::Cancelled);
		}

		let token = &ctx.cancellation_token;
		let run = self
			.sweeper
			.run(|| token.is_cancelled())
			.await
			.map_err(|e| JobError::Failed {
				message: format!("Reconciliation sweep failed: {e}"),
				retryable: true,
			})?;

		if run.cancelled {
			return Err(JobError::Cancelled);
		}

		let summary = run.summary();
		Ok(JobOutput {
			message: format!(
				"Reconciled {} subjects: {} created, {} enriched, {} failed",
				summary.visited, summary.created, summary.enriched, summary.failed
			),
			metadata: serde_json::to_value(summary).ok(),
		})
	}
}
