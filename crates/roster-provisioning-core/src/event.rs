// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every occurrence the provisioning ledger can record.
///
/// One taxonomy for the hook, the sweeper and the error store; the ledger is for
/// counting and correlation, not a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventType {
	IdentityCreated,
	ProfileBootstrapOk,
	ProfileBootstrapError,
	ReconciliationRepaired,
	ReconciliationFailed,
	/// The error store itself could not persist a failure.
	ErrorCaptureFailed,
}

impl LifecycleEventType {
	pub fn all() -> &'static [LifecycleEventType] {
		&[
			LifecycleEventType::IdentityCreated,
			LifecycleEventType::ProfileBootstrapOk,
			LifecycleEventType::ProfileBootstrapError,
			LifecycleEventType::ReconciliationRepaired,
			LifecycleEventType::ReconciliationFailed,
			LifecycleEventType::ErrorCaptureFailed,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			LifecycleEventType::IdentityCreated => "identity_created",
			LifecycleEventType::ProfileBootstrapOk => "profile_bootstrap_ok",
			LifecycleEventType::ProfileBootstrapError => "profile_bootstrap_error",
			LifecycleEventType::ReconciliationRepaired => "reconciliation_repaired",
			LifecycleEventType::ReconciliationFailed => "reconciliation_failed",
			LifecycleEventType::ErrorCaptureFailed => "error_capture_failed",
		}
	}

	pub fn is_failure(&self) -> bool {
		matches!(
			self,
			LifecycleEventType::ProfileBootstrapError
				| LifecycleEventType::ReconciliationFailed
				| LifecycleEventType::ErrorCaptureFailed
		)
	}
}

impl fmt::Display for LifecycleEventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for LifecycleEventType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		LifecycleEventType::all()
			.iter()
			.copied()
			.find(|t| t.as_str() == s)
			.ok_or_else(|| format!("unknown lifecycle event type: {s}"))
	}
}
