// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Profile provisioning configuration.

use roster_provisioning_core::{AccountType, UnknownAccountTypePolicy};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisioningConfig {
	/// Account type stored when the caller supplies none (or, under `coerce`, an unknown one).
	pub default_account_type: AccountType,
	pub unknown_account_type_policy: UnknownAccountTypePolicy,
}

impl Default for ProvisioningConfig {
	fn default() -> Self {
		Self {
			default_account_type: AccountType::Professional,
			unknown_account_type_policy: UnknownAccountTypePolicy::Coerce,
		}
	}
}

/// Values are kept as strings until finalize so env and TOML share one parser.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ProvisioningConfigLayer {
	#[serde(default)]
	pub default_account_type: Option<String>,
	#[serde(default)]
	pub unknown_account_type_policy: Option<String>,
}

impl ProvisioningConfigLayer {
	pub fn merge(&mut self, other: ProvisioningConfigLayer) {
		if other.default_account_type.is_some() {
			self.default_account_type = other.default_account_type;
		}
		if other.unknown_account_type_policy.is_some() {
			self.unknown_account_type_policy = other.unknown_account_type_policy;
		}
	}

	pub fn finalize(self) -> Result<ProvisioningConfig, String> {
		let defaults = ProvisioningConfig::default();

		let default_account_type = match self.default_account_type {
			Some(raw) => roster_provisioning_core::normalize_account_type(&raw)
				.ok_or_else(|| format!("unknown default_account_type '{raw}'"))?,
			None => defaults.default_account_type,
		};

		let unknown_account_type_policy = match self.unknown_account_type_policy {
			Some(raw) => raw.parse()?,
			None => defaults.unknown_account_type_policy,
		};

		Ok(ProvisioningConfig {
			default_account_type,
			unknown_account_type_policy,
		})
	}
}
