// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::context::JobContext;
use crate::error::JobError;
use crate::types::JobOutput;

/// A unit of background work the scheduler can run.
///
/// Long-running jobs should poll `ctx.cancellation_token` between units of work and
/// return [`JobError::Cancelled`] when it fires.
#[async_trait]
pub trait Job: Send + Sync {
	/// Stable identifier, used as the `job_definitions` primary key.
	fn id(&self) -> &str;
	fn name(&self) -> &str;
	fn description(&self) -> &str;
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError>;
}
