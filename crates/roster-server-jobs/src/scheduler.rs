// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::context::{CancellationToken, JobContext};
use crate::error::{JobError, Result};
use crate::health::{HealthState, JobHealthStatus, JobsHealthStatus};
use crate::job::Job;
use crate::types::{JobDefinition, JobRun, JobStatus, TriggerSource};
use chrono::Utc;
use roster_server_db::JobRepository;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Exponential backoff applied to retryable failures within one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
	pub max_retries: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub factor: f64,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(60),
			factor: 2.0,
		}
	}
}

impl RetryPolicy {
	/// Delay before retry number `retry_count` (1-based).
	pub fn delay_for(&self, retry_count: u32) -> Duration {
		let exponent = retry_count.saturating_sub(1) as i32;
		let delay = self.base_delay.as_secs_f64() * self.factor.powi(exponent);
		Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
	}
}

struct RegisteredJob {
	job: Arc<dyn Job>,
	interval: Duration,
	cancellation_token: CancellationToken,
}

/// Runs registered jobs on their interval and records every run.
///
/// The same registrations back operator commands: `trigger_job` runs one immediately
/// and `health_status` reads the recorded history, without starting the loops.
pub struct JobScheduler {
	jobs: BTreeMap<String, RegisteredJob>,
	repository: Arc<JobRepository>,
	retry_policy: RetryPolicy,
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl JobScheduler {
	pub fn new(repository: Arc<JobRepository>) -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			jobs: BTreeMap::new(),
			repository,
			retry_policy: RetryPolicy::default(),
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
		}
	}

	pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
		self.retry_policy = retry_policy;
		self
	}

	pub fn register_periodic(&mut self, job: Arc<dyn Job>, interval: Duration) {
		let id = job.id().to_string();
		self.jobs.insert(
			id,
			RegisteredJob {
				job,
				interval,
				cancellation_token: CancellationToken::new(),
			},
		);
	}

	/// Store a definition row for every registered job. Runs reference these rows.
	#[instrument(skip(self))]
	pub async fn persist_definitions(&self) -> Result<()> {
		for (job_id, registered) in &self.jobs {
			self
				.repository
				.upsert_definition(&JobDefinition {
					id: job_id.clone(),
					name: registered.job.name().to_string(),
					description: registered.job.description().to_string(),
					job_type: "periodic".to_string(),
					interval_secs: Some(registered.interval.as_secs() as i64),
					enabled: true,
				})
				.await?;
		}
		Ok(())
	}

	/// Persist job definitions and spawn one loop per job.
	#[instrument(skip(self))]
	pub async fn start(&self) -> Result<()> {
		self.persist_definitions().await?;
		let mut handles = self.handles.lock().await;

		for (job_id, registered) in &self.jobs {
			let job = Arc::clone(&registered.job);
			let repository = Arc::clone(&self.repository);
			let retry_policy = self.retry_policy;
			let interval = registered.interval;
			let cancellation_token = registered.cancellation_token.clone();
			let mut shutdown_rx = self.shutdown_tx.subscribe();
			let job_id = job_id.clone();

			handles.push(tokio::spawn(async move {
				loop {
					tokio::select! {
						_ = tokio::time::sleep(interval) => {
							if cancellation_token.is_cancelled() {
								continue;
							}
							let _ = run_job_with_retry(
								&job,
								&repository,
								&retry_policy,
								TriggerSource::Schedule,
								&cancellation_token,
							)
							.await;
						}
						_ = shutdown_rx.recv() => {
							info!(job_id = %job_id, "Shutting down periodic job");
							break;
						}
					}
				}
			}));
		}

		info!(job_count = handles.len(), "Job scheduler started");
		Ok(())
	}

	/// Run a registered job now and wait for it. Returns the run id.
	#[instrument(skip(self))]
	pub async fn trigger_job(&self, job_id: &str, triggered_by: TriggerSource) -> Result<String> {
		let registered = self
			.jobs
			.get(job_id)
			.ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

		run_job_with_retry(
			&registered.job,
			&self.repository,
			&self.retry_policy,
			triggered_by,
			&registered.cancellation_token,
		)
		.await
	}

	/// Cancel running jobs, stop the loops and wait for them to exit.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		for registered in self.jobs.values() {
			registered.cancellation_token.cancel();
		}
		let _ = self.shutdown_tx.send(());

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			let _ = handle.await;
		}

		info!("Job scheduler shut down");
	}

	#[instrument(skip(self))]
	pub async fn job_status(&self, job_id: &str) -> Option<JobHealthStatus> {
		let registered = self.jobs.get(job_id)?;

		let last_run = self.repository.get_last_run(job_id).await.ok().flatten();
		let consecutive_failures = self
			.repository
			.count_consecutive_failures(job_id)
			.await
			.unwrap_or(0);

		Some(JobHealthStatus {
			job_id: job_id.to_string(),
			name: registered.job.name().to_string(),
			status: HealthState::from_last_run(last_run.as_ref(), consecutive_failures),
			last_run: last_run.map(Into::into),
			consecutive_failures,
		})
	}

	#[instrument(skip(self))]
	pub async fn health_status(&self) -> JobsHealthStatus {
		let mut jobs = Vec::with_capacity(self.jobs.len());
		for job_id in self.jobs.keys() {
			if let Some(status) = self.job_status(job_id).await {
				jobs.push(status);
			}
		}
		JobsHealthStatus::from_jobs(jobs)
	}
}

async fn run_job_with_retry(
	job: &Arc<dyn Job>,
	repository: &JobRepository,
	retry_policy: &RetryPolicy,
	triggered_by: TriggerSource,
	cancellation_token: &CancellationToken,
) -> Result<String> {
	let run_id = uuid::Uuid::new_v4().to_string();
	let mut retry_count = 0u32;

	repository
		.record_run_start(&JobRun {
			id: run_id.clone(),
			job_id: job.id().to_string(),
			status: JobStatus::Running,
			started_at: Utc::now(),
			completed_at: None,
			duration_ms: None,
			error_message: None,
			retry_count,
			triggered_by,
			metadata: None,
		})
		.await?;

	loop {
		let ctx = JobContext {
			run_id: run_id.clone(),
			triggered_by: if retry_count > 0 {
				TriggerSource::Retry
			} else {
				triggered_by
			},
			cancellation_token: cancellation_token.clone(),
		};

		let (status, error, metadata, result) = match job.run(&ctx).await {
			Ok(output) => {
				info!(job_id = %job.id(), run_id = %run_id, message = %output.message, "Job completed successfully");
				(JobStatus::Succeeded, None, output.metadata, Ok(run_id.clone()))
			}
			Err(JobError::Cancelled) => {
				info!(job_id = %job.id(), run_id = %run_id, "Job cancelled");
				(JobStatus::Cancelled, None, None, Err(JobError::Cancelled))
			}
			Err(JobError::Failed { message, retryable })
				if retryable
					&& retry_count < retry_policy.max_retries
					&& !cancellation_token.is_cancelled() =>
			{
				retry_count += 1;
				let delay = retry_policy.delay_for(retry_count);
				warn!(
					job_id = %job.id(),
					run_id = %run_id,
					retry_count,
					delay_ms = delay.as_millis() as u64,
					error = %message,
					"Job failed, retrying"
				);
				tokio::time::sleep(delay).await;
				continue;
			}
			Err(e) => {
				let message = e.to_string();
				warn!(job_id = %job.id(), run_id = %run_id, error = %message, "Job failed");
				(JobStatus::Failed, Some(message), None, Err(e))
			}
		};

		repository
			.record_run_complete(&run_id, status, retry_count, error, metadata)
			.await?;
		return result;
	}
}
