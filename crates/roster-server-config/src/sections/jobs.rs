// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Jobs configuration section.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct JobsConfigLayer {
	pub history_retention_days: Option<u32>,
	pub history_cleanup_interval_secs: Option<u64>,
}

impl JobsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.history_retention_days.is_some() {
			self.history_retention_days = other.history_retention_days;
		}
		if other.history_cleanup_interval_secs.is_some() {
			self.history_cleanup_interval_secs = other.history_cleanup_interval_secs;
		}
	}

	pub fn finalize(self) -> JobsConfig {
		let defaults = JobsConfig::default();
		JobsConfig {
			history_retention_days: self
				.history_retention_days
				.unwrap_or(defaults.history_retention_days),
			history_cleanup_interval_secs: self
				.history_cleanup_interval_secs
				.unwrap_or(defaults.history_cleanup_interval_secs),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobsConfig {
	pub history_retention_days: u32,
	pub history_cleanup_interval_secs: u64,
}

impl Default for JobsConfig {
	fn default() -> Self {
		Self {
			history_retention_days: 90,
			history_cleanup_interval_secs: 86400, // 24 hours
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_layer_finalize_defaults() {
		let config = JobsConfigLayer::default().finalize();
		assert_eq!(config.history_retention_days, 90);
		assert_eq!(config.history_cleanup_interval_secs, 86400);
	}

	#[test]
	fn test_deserialize_layer_partial() {
		let layer: JobsConfigLayer = toml::from_str("history_retention_days = 7").unwrap();
		assert_eq!(layer.history_retention_days, Some(7));
		assert!(layer.history_cleanup_interval_secs.is_none());
	}
}
