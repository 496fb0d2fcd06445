// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections. Each has a resolved struct and a partial `*Layer`.

mod analyzer;
mod database;
mod jobs;
mod logging;
mod provisioning;
mod sweeper;

pub use analyzer::{AnalyzerConfig, AnalyzerConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use jobs::{JobsConfig, JobsConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use provisioning::{ProvisioningConfig, ProvisioningConfigLayer};
pub use sweeper::{SweeperConfig, SweeperConfigLayer};
