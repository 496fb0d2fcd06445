// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Correlation and anomaly analyzer thresholds.

use serde::Deserialize;

/// Analyzer thresholds (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
	/// Lookback window for block-rate reports.
	pub window_hours: u32,
	/// Block rate strictly above this is critical.
	pub critical_block_rate: f64,
	/// Block rate at or above this is a warning.
	pub warning_block_rate: f64,
	pub distributed_min_blocked: u32,
	pub distributed_min_sources: u32,
	pub legit_min_attempts: u32,
	pub legit_max_attempts: u32,
	pub legit_max_sources: u32,
	pub legit_recent_days: u32,
	/// Marker the provider appends to the actor of a blocked signup.
	pub blocked_marker: String,
	/// Audit trail action that counts as a signup attempt.
	pub signup_action: String,
	/// Substrings that mark an email domain as disposable.
	pub disposable_domains: Vec<String>,
}

impl Default for AnalyzerConfig {
	fn default() -> Self {
		Self {
			window_hours: 24,
			critical_block_rate: 0.50,
			warning_block_rate: 0.25,
			distributed_min_blocked: 100,
			distributed_min_sources: 50,
			legit_min_attempts: 2,
			legit_max_attempts: 20,
			legit_max_sources: 3,
			legit_recent_days: 7,
			blocked_marker: "[blocked]".to_string(),
			signup_action: "user_signedup".to_string(),
			disposable_domains: [
				"mailinator",
				"guerrillamail",
				"10minutemail",
				"tempmail",
				"throwaway",
				"yopmail",
				"trashmail",
			]
			.iter()
			.map(|s| s.to_string())
			.collect(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AnalyzerConfigLayer {
	#[serde(default)]
	pub window_hours: Option<u32>,
	#[serde(default)]
	pub critical_block_rate: Option<f64>,
	#[serde(default)]
	pub warning_block_rate: Option<f64>,
	#[serde(default)]
	pub distributed_min_blocked: Option<u32>,
	#[serde(default)]
	pub distributed_min_sources: Option<u32>,
	#[serde(default)]
	pub legit_min_attempts: Option<u32>,
	#[serde(default)]
	pub legit_max_attempts: Option<u32>,
	#[serde(default)]
	pub legit_max_sources: Option<u32>,
	#[serde(default)]
	pub legit_recent_days: Option<u32>,
	#[serde(default)]
	pub blocked_marker: Option<String>,
	#[serde(default)]
	pub signup_action: Option<String>,
	#[serde(default)]
	pub disposable_domains: Option<Vec<String>>,
}

macro_rules! merge_fields {
	($self:ident, $other:ident, $($field:ident),+ $(,)?) => {
		$(
			if $other.$field.is_some() {
				$self.$field = $other.$field;
			}
		)+
	};
}

impl AnalyzerConfigLayer {
	pub fn merge(&mut self, other: AnalyzerConfigLayer) {
		merge_fields!(
			self,
			other,
			window_hours,
			critical_block_rate,
			warning_block_rate,
			distributed_min_blocked,
			distributed_min_sources,
			legit_min_attempts,
			legit_max_attempts,
			legit_max_sources,
			legit_recent_days,
			blocked_marker,
			signup_action,
			disposable_domains,
		);
	}

	pub fn finalize(self) -> AnalyzerConfig {
		let d = AnalyzerConfig::default();
		AnalyzerConfig {
			window_hours: self.window_hours.unwrap_or(d.window_hours),
			critical_block_rate: self.critical_block_rate.unwrap_or(d.critical_block_rate),
			warning_block_rate: self.warning_block_rate.unwrap_or(d.warning_block_rate),
			distributed_min_blocked: self
				.distributed_min_blocked
				.unwrap_or(d.distributed_min_blocked),
			distributed_min_sources: self
				.distributed_min_sources
				.unwrap_or(d.distributed_min_sources),
			legit_min_attempts: self.legit_min_attempts.unwrap_or(d.legit_min_attempts),
			legit_max_attempts: self.legit_max_attempts.unwrap_or(d.legit_max_attempts),
			legit_max_sources: self.legit_max_sources.unwrap_or(d.legit_max_sources),
			legit_recent_days: self.legit_recent_days.unwrap_or(d.legit_recent_days),
			blocked_marker: self.blocked_marker.unwrap_or(d.blocked_marker),
			signup_action: self.signup_action.unwrap_or(d.signup_action),
			disposable_domains: self.disposable_domains.unwrap_or(d.disposable_domains),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_match_documented_thresholds() {
		let config = AnalyzerConfigLayer::default().finalize();
		assert_eq!(config.critical_block_rate, 0.50);
		assert_eq!(config.warning_block_rate, 0.25);
		assert_eq!(config.distributed_min_blocked, 100);
		assert_eq!(config.distributed_min_sources, 50);
		assert_eq!(
			(config.legit_min_attempts, config.legit_max_attempts),
			(2, 20)
		);
		assert_eq!(config.blocked_marker, "[blocked]");
	}

	#[test]
	fn test_toml_overrides_list() {
		let layer: AnalyzerConfigLayer = toml::from_str(
			r#"
warning_block_rate = 0.1
disposable_domains = ["example-temp"]
"#,
		)
		.unwrap();
		let config = layer.finalize();
		assert_eq!(config.warning_block_rate, 0.1);
		assert_eq!(config.disposable_domains, vec!["example-temp".to_string()]);
		assert_eq!(config.window_hours, 24);
	}
}
