// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account_type::AccountType;
use crate::types::IdentityId;

/// Application-owned profile, 1:1 with an identity.
///
/// Onboarding flows extend this row later; provisioning only ever fills blanks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
	pub id: IdentityId,
	pub email: Option<String>,
	pub full_name: Option<String>,
	pub phone: Option<String>,
	pub account_type: AccountType,
	/// Whether `account_type` came from the configured default rather than a caller.
	pub account_type_defaulted: bool,
	pub business_name: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// What a single merge did to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
	/// No row existed; one was inserted.
	Created,
	/// A row existed and at least one blank field was filled.
	Enriched,
	/// A row existed and nothing was written.
	Unchanged,
}

impl MergeOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			MergeOutcome::Created => "created",
			MergeOutcome::Enriched => "enriched",
			MergeOutcome::Unchanged => "unchanged",
		}
	}
}

impl fmt::Display for MergeOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
