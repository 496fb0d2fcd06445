// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use roster_server_config::JobsConfig;
use roster_server_jobs::{Job, JobContext, JobError, JobOutput, JobRepository};
use std::sync::Arc;

/// Prunes completed job runs older than the configured retention.
pub struct JobHistoryCleanupJob {
	repository: Arc<JobRepository>,
	retention_days: u32,
}

impl JobHistoryCleanupJob {
	pub fn new(repository: Arc<JobRepository>, config: &JobsConfig) -> Self {
		Self {
			repository,
			retention_days: config.history_retention_days,
		}
	}
}

#[async_trait]
impl Job for JobHistoryCleanupJob {
	fn id(&self) -> &str {
		"job-history-cleanup"
	}

	fn name(&self) -> &str {
		"Job History Cleanup"
	}

	fn description(&self) -> &str {
		"Deletes completed job runs past the retention period"
	}

	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		if ctx.cancellation_token.is_cancelled() {
			return Err(JobError::Cancelled);
		}

		let deleted = self
			.repository
			.cleanup_old_runs(self.retention_days)
			.await
			.map_err(|e| JobError::Failed {
				message: format!("Job history cleanup failed: {e}"),
				retryable: true,
			})?;

		tracing::info!(
			deleted,
			retention_days = self.retention_days,
			"job history pruned"
		);
		Ok(JobOutput {
			message: format!("Deleted {deleted} job runs older than {} days", self.retention_days),
			metadata: Some(serde_json::json!({
				"deleted_count": deleted,
				"retention_days": self.retention_days,
			})),
		})
	}
}
