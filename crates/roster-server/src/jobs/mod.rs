// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background jobs run by `serve` and inspected by `jobs`.

mod job_history_cleanup;
mod reconciliation;

pub use job_history_cleanup::JobHistoryCleanupJob;
pub use reconciliation::ReconciliationJob;

use crate::app::App;
use roster_server_config::ServerConfig;
use roster_server_jobs::JobScheduler;
use std::sync::Arc;
use std::time::Duration;

/// Scheduler with every configured job registered. Nothing is started.
pub fn build_scheduler(app: &App, config: &ServerConfig) -> JobScheduler {
	let mut scheduler = JobScheduler::new(Arc::clone(&app.jobs));

	if config.sweeper.enabled {
		scheduler.register_periodic(
			Arc::new(ReconciliationJob::new(app.sweeper.clone())),
			Duration::from_secs(config.sweeper.interval_secs),
		);
	} else {
		tracing::info!("profile reconciliation disabled");
	}

	scheduler.register_periodic(
		Arc::new(JobHistoryCleanupJob::new(Arc::clone(&app.jobs), &config.jobs)),
		Duration::from_secs(config.jobs.history_cleanup_interval_secs),
	);

	scheduler
}
