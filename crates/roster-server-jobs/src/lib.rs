// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background job scheduler for Roster server.
//!
//! Runs periodic jobs with retry support and health reporting. Run
//! history is persisted through [`roster_server_db::JobRepository`].

pub mod context;
pub mod error;
pub mod health;
pub mod job;
pub mod scheduler;
pub mod types;

pub use context::{CancellationToken, JobContext};
pub use error::{JobError, Result};
pub use health::{HealthState, JobHealthStatus, JobsHealthStatus, LastRunInfo};
pub use job::Job;
pub use roster_server_db::JobRepository;
pub use scheduler::{JobScheduler, RetryPolicy};
pub use types::{JobDefinition, JobOutput, JobRun, JobStatus, TriggerSource};
