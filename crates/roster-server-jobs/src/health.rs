// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::types::{JobRun, JobStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Consecutive failures at which a job is reported unhealthy.
const UNHEALTHY_AFTER_FAILURES: u32 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct JobHealthStatus {
	pub job_id: String,
	pub name: String,
	pub status: HealthState,
	pub last_run: Option<LastRunInfo>,
	pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastRunInfo {
	pub run_id: String,
	pub status: JobStatus,
	pub started_at: DateTime<Utc>,
	pub duration_ms: Option<i64>,
	pub error: Option<String>,
}

impl From<JobRun> for LastRunInfo {
	fn from(run: JobRun) -> Self {
		Self {
			run_id: run.id,
			status: run.status,
			started_at: run.started_at,
			duration_ms: run.duration_ms,
			error: run.error_message,
		}
	}
}

/// Ordered from best to worst.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
	Healthy,
	Degraded,
	Unhealthy,
}

impl HealthState {
	/// Health implied by the latest run and the failure streak leading up to it.
	pub fn from_last_run(last_run: Option<&JobRun>, consecutive_failures: u32) -> Self {
		match last_run.map(|r| r.status) {
			Some(JobStatus::Failed) if consecutive_failures >= UNHEALTHY_AFTER_FAILURES => {
				HealthState::Unhealthy
			}
			Some(JobStatus::Failed) if consecutive_failures >= 1 => HealthState::Degraded,
			_ => HealthState::Healthy,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct JobsHealthStatus {
	pub status: HealthState,
	pub jobs: Vec<JobHealthStatus>,
}

impl JobsHealthStatus {
	/// Overall state is the worst state of any job.
	pub fn from_jobs(jobs: Vec<JobHealthStatus>) -> Self {
		let status = jobs
			.iter()
			.map(|j| j.status)
			.max()
			.unwrap_or(HealthState::Healthy);
		Self { status, jobs }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TriggerSource;

	fn run(status: JobStatus) -> JobRun {
		JobRun {
			id: "run-1".to_string(),
			job_id: "profile-reconciliation".to_string(),
			status,
			started_at: Utc::now(),
			completed_at: None,
			duration_ms: None,
			error_message: None,
			retry_count: 0,
			triggered_by: TriggerSource::Schedule,
			metadata: None,
		}
	}

	fn job(status: HealthState) -> JobHealthStatus {
		JobHealthStatus {
			job_id: "job".to_string(),
			name: "Job".to_string(),
			status,
			last_run: None,
			consecutive_failures: 0,
		}
	}

	#[test]
	fn never_run_is_healthy() {
		assert_eq!(HealthState::from_last_run(None, 0), HealthState::Healthy);
	}

	#[test]
	fn non_failed_runs_are_healthy() {
		for status in [JobStatus::Succeeded, JobStatus::Running, JobStatus::Cancelled] {
			assert_eq!(
				HealthState::from_last_run(Some(&run(status)), 0),
				HealthState::Healthy
			);
		}
	}

	#[test]
	fn failure_streak_degrades_then_fails() {
		let failed = run(JobStatus::Failed);
		assert_eq!(HealthState::from_last_run(Some(&failed), 0), HealthState::Healthy);
		assert_eq!(HealthState::from_last_run(Some(&failed), 1), HealthState::Degraded);
		assert_eq!(HealthState::from_last_run(Some(&failed), 2), HealthState::Degraded);
		assert_eq!(HealthState::from_last_run(Some(&failed), 3), HealthState::Unhealthy);
		assert_eq!(HealthState::from_last_run(Some(&failed), 9), HealthState::Unhealthy);
	}

	#[test]
	fn overall_state_is_worst_job() {
		let overall = JobsHealthStatus::from_jobs(vec![
			job(HealthState::Healthy),
			job(HealthState::Degraded),
		]);
		assert_eq!(overall.status, HealthState::Degraded);
		assert_eq!(JobsHealthStatus::from_jobs(vec![]).status, HealthState::Healthy);
	}
}
