// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reconciliation sweeper configuration.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
	/// Whether `serve` schedules the sweeper. Manual `sweep` runs ignore this.
	pub enabled: bool,
	pub interval_secs: u64,
	/// Identities fetched per page.
	pub batch_size: u32,
	/// Upper bound on subjects visited in a single run.
	pub max_subjects_per_run: u32,
}

impl Default for SweeperConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			interval_secs: 300,
			batch_size: 100,
			max_subjects_per_run: 1000,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SweeperConfigLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub interval_secs: Option<u64>,
	#[serde(default)]
	pub batch_size: Option<u32>,
	#[serde(default)]
	pub max_subjects_per_run: Option<u32>,
}

impl SweeperConfigLayer {
	pub fn merge(&mut self, other: SweeperConfigLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.interval_secs.is_some() {
			self.interval_secs = other.interval_secs;
		}
		if other.batch_size.is_some() {
			self.batch_size = other.batch_size;
		}
		if other.max_subjects_per_run.is_some() {
			self.max_subjects_per_run = other.max_subjects_per_run;
		}
	}

	pub fn finalize(self) -> SweeperConfig {
		let defaults = SweeperConfig::default();
		SweeperConfig {
			enabled: self.enabled.unwrap_or(defaults.enabled),
			interval_secs: self.interval_secs.unwrap_or(defaults.interval_secs),
			batch_size: self.batch_size.unwrap_or(defaults.batch_size),
			max_subjects_per_run: self
				.max_subjects_per_run
				.unwrap_or(defaults.max_subjects_per_run),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut base = SweeperConfigLayer {
			interval_secs: Some(60),
			batch_size: Some(10),
			..Default::default()
		};
		base.merge(SweeperConfigLayer {
			batch_size: Some(25),
			..Default::default()
		});
		let config = base.finalize();
		assert_eq!(config.interval_secs, 60);
		assert_eq!(config.batch_size, 25);
		assert_eq!(config.max_subjects_per_run, 1000);
		assert!(config.enabled);
	}
}
