// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning health and signup anomaly analysis for Roster server.
//!
//! Nothing here writes. [`Analyzer::classify`] correlates identities, profiles, and the
//! lifecycle ledger; [`Analyzer::blocked_emails`] and [`Analyzer::block_rate_report`]
//! read the provider's audit trail.

pub mod anomaly;
pub mod blocked;
pub mod classify;
pub mod error;
pub mod service;

pub use anomaly::{compute_block_rate, AnomalyLevel, BlockRateReport};
pub use blocked::{aggregate_blocked, extract_blocked_email, BlockedEmail, IdentityIndex};
pub use classify::{
	classify_subjects, ClassificationRow, ClassificationStatus, EventCounts, HealthSummary,
};
pub use error::{AnalyzerError, Result};
pub use service::Analyzer;
