// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Signup block-rate anomaly detection.

use chrono::{DateTime, Duration, Utc};
use roster_server_config::AnalyzerConfig;
use roster_server_db::AuditTrailEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::blocked::extract_blocked_email;

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyLevel {
	None,
	Warning,
	Critical,
}

impl AnomalyLevel {
	/// Critical strictly above the critical rate, warning at or above the warning rate.
	pub fn from_rate(rate: f64, config: &AnalyzerConfig) -> Self {
		if rate > config.critical_block_rate {
			AnomalyLevel::Critical
		} else if rate >= config.warning_block_rate {
			AnomalyLevel::Warning
		} else {
			AnomalyLevel::None
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AnomalyLevel::None => "none",
			AnomalyLevel::Warning => "warning",
			AnomalyLevel::Critical => "critical",
		}
	}
}

impl fmt::Display for AnomalyLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRateReport {
	pub window_start: DateTime<Utc>,
	pub window_end: DateTime<Utc>,
	pub total_attempts: u64,
	pub blocked_attempts: u64,
	pub block_rate: f64,
	pub distinct_blocked_sources: u64,
	pub level: AnomalyLevel,
	pub distributed_abuse: bool,
}

/// Start of the anomaly window, clamped to the earliest representable instant.
pub fn window_start(config: &AnalyzerConfig, now: DateTime<Utc>) -> DateTime<Utc> {
	now.checked_sub_signed(Duration::hours(i64::from(config.window_hours)))
		.unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Build a report from audit entries. Entries outside the window are ignored.
///
/// A signup attempt is any entry with the configured signup action, plus any entry
/// carrying the blocked marker.
pub fn compute_block_rate(
	entries: &[AuditTrailEntry],
	config: &AnalyzerConfig,
	now: DateTime<Utc>,
) -> BlockRateReport {
	let start = window_start(config, now);
	let mut total_attempts = 0u64;
	let mut blocked_attempts = 0u64;
	let mut sources = HashSet::new();

	for entry in entries
		.iter()
		.filter(|e| e.created_at >= start && e.created_at <= now)
	{
		let blocked = extract_blocked_email(&entry.actor, &config.blocked_marker).is_some();
		if !blocked && entry.action != config.signup_action {
			continue;
		}
		total_attempts += 1;
		if blocked {
			blocked_attempts += 1;
			if let Some(source) = entry.source.as_deref() {
				sources.insert(source);
			}
		}
	}

	let block_rate = if total_attempts == 0 {
		0.0
	} else {
		blocked_attempts as f64 / total_attempts as f64
	};
	let distinct_blocked_sources = sources.len() as u64;

	BlockRateReport {
		window_start: start,
		window_end: now,
		total_attempts,
		blocked_attempts,
		block_rate,
		distinct_blocked_sources,
		level: AnomalyLevel::from_rate(block_rate, config),
		distributed_abuse: blocked_attempts > u64::from(config.distributed_min_blocked)
			&& distinct_blocked_sources > u64::from(config.distributed_min_sources),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn attempts(total: usize, blocked: usize, now: DateTime<Utc>) -> Vec<AuditTrailEntry> {
		(0..total)
			.map(|i| {
				let actor = if i < blocked {
					format!("user{i}@example.com [blocked]")
				} else {
					format!("user{i}@example.com")
				};
				AuditTrailEntry::new("user_signedup", actor)
					.with_source(format!("10.0.{}.{}", i / 256, i % 256))
					.with_created_at(now - Duration::minutes(i as i64))
			})
			.collect()
	}

	fn level(total: usize, blocked: usize) -> AnomalyLevel {
		let now = Utc::now();
		compute_block_rate(&attempts(total, blocked, now), &AnalyzerConfig::default(), now).level
	}

	#[test]
	fn oversized_window_clamps_instead_of_overflowing() {
		let config = AnalyzerConfig {
			window_hours: u32::MAX,
			..Default::default()
		};
		let now = Utc::now();
		let report = compute_block_rate(&attempts(10, 6, now), &config, now);

		assert_eq!(report.window_start, DateTime::<Utc>::MIN_UTC);
		assert_eq!(report.total_attempts, 10);
		assert_eq!(report.level, AnomalyLevel::Critical);
	}

	#[test]
	fn classifies_block_rates() {
		assert_eq!(level(60, 35), AnomalyLevel::Critical);
		assert_eq!(level(20, 6), AnomalyLevel::Warning);
		assert_eq!(level(10, 1), AnomalyLevel::None);
	}

	#[test]
	fn thresholds_are_strict_for_critical_inclusive_for_warning() {
		assert_eq!(level(4, 2), AnomalyLevel::Warning);
		assert_eq!(level(4, 1), AnomalyLevel::Warning);
		assert_eq!(level(0, 0), AnomalyLevel::None);
	}

	#[test]
	fn ignores_entries_outside_window_and_other_actions() {
		let now = Utc::now();
		let mut entries = attempts(10, 1, now);
		entries.push(
			AuditTrailEntry::new("user_signedup", "old@example.com [blocked]")
				.with_created_at(now - Duration::hours(48)),
		);
		entries.push(AuditTrailEntry::new("login", "someone@example.com").with_created_at(now));

		let report = compute_block_rate(&entries, &AnalyzerConfig::default(), now);
		assert_eq!(report.total_attempts, 10);
		assert_eq!(report.blocked_attempts, 1);
		assert!((report.block_rate - 0.1).abs() < f64::EPSILON);
	}

	#[test]
	fn distributed_abuse_needs_volume_and_spread() {
		let now = Utc::now();
		let config = AnalyzerConfig::default();

		let wide = compute_block_rate(&attempts(200, 101, now), &config, now);
		assert_eq!(wide.distinct_blocked_sources, 101);
		assert!(wide.distributed_abuse);

		let exactly_threshold = compute_block_rate(&attempts(200, 100, now), &config, now);
		assert!(!exactly_threshold.distributed_abuse);

		let narrow: Vec<_> = attempts(200, 150, now)
			.into_iter()
			.map(|e| e.with_source("10.0.0.1"))
			.collect();
		let narrow = compute_block_rate(&narrow, &config, now);
		assert_eq!(narrow.distinct_blocked_sources, 1);
		assert!(!narrow.distributed_abuse);
	}
}
