// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Correlation of identities, profiles, and lifecycle events.

use roster_provisioning_core::{IdentityId, IdentityRecord, Profile};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Provisioning state of one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationStatus {
	/// Identity has a profile and at least one lifecycle event.
	Healthy,
	/// Identity has no profile.
	MissingProfile,
	/// Identity has a profile but the ledger never saw it.
	MissingLifecycleEvent,
	/// Profile whose identity no longer exists.
	OrphanProfile,
}

impl ClassificationStatus {
	pub fn all() -> &'static [ClassificationStatus] {
		&[
			ClassificationStatus::Healthy,
			ClassificationStatus::MissingProfile,
			ClassificationStatus::MissingLifecycleEvent,
			ClassificationStatus::OrphanProfile,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			ClassificationStatus::Healthy => "healthy",
			ClassificationStatus::MissingProfile => "missing_profile",
			ClassificationStatus::MissingLifecycleEvent => "missing_lifecycle_event",
			ClassificationStatus::OrphanProfile => "orphan_profile",
		}
	}
}

impl fmt::Display for ClassificationStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ClassificationStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		ClassificationStatus::all()
			.iter()
			.copied()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| format!("unknown classification status: {s}"))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRow {
	pub subject_id: IdentityId,
	pub email: Option<String>,
	pub status: ClassificationStatus,
	pub event_count: i64,
}

/// Counts per status over a set of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
	pub total: usize,
	pub healthy: usize,
	pub missing_profile: usize,
	pub missing_lifecycle_event: usize,
	pub orphan_profile: usize,
}

impl HealthSummary {
	pub fn from_rows(rows: &[ClassificationRow]) -> Self {
		let mut summary = HealthSummary {
			total: rows.len(),
			..Default::default()
		};
		for row in rows {
			match row.status {
				ClassificationStatus::Healthy => summary.healthy += 1,
				ClassificationStatus::MissingProfile => summary.missing_profile += 1,
				ClassificationStatus::MissingLifecycleEvent => summary.missing_lifecycle_event += 1,
				ClassificationStatus::OrphanProfile => summary.orphan_profile += 1,
			}
		}
		summary
	}

	pub fn is_healthy(&self) -> bool {
		self.healthy == self.total
	}
}

/// Ledger event counts keyed by subject id and by lowercase email snapshot.
#[derive(Debug, Clone, Default)]
pub struct EventCounts {
	pub by_subject: HashMap<String, i64>,
	pub by_email: HashMap<String, i64>,
}

impl EventCounts {
	/// Events for a subject. Falls back to the email snapshot only when no event
	/// carries the subject id.
	pub fn count_for(&self, subject_id: IdentityId, email: Option<&str>) -> i64 {
		if let Some(count) = self.by_subject.get(&subject_id.to_string()) {
			return *count;
		}
		email
			.map(|e| e.trim().to_lowercase())
			.and_then(|e| self.by_email.get(&e).copied())
			.unwrap_or(0)
	}
}

/// Classify every identity, then append one row per orphan profile.
pub fn classify_subjects(
	identities: &[IdentityRecord],
	profile_ids: &HashSet<IdentityId>,
	orphans: &[Profile],
	counts: &EventCounts,
) -> Vec<ClassificationRow> {
	let mut rows: Vec<ClassificationRow> = identities
		.iter()
		.map(|identity| {
			let email = identity.email.clone();
			let event_count = counts.count_for(identity.id, email.as_deref());
			let status = if !profile_ids.contains(&identity.id) {
				ClassificationStatus::MissingProfile
			} else if event_count == 0 {
				ClassificationStatus::MissingLifecycleEvent
			} else {
				ClassificationStatus::Healthy
			};
			ClassificationRow {
				subject_id: identity.id,
				email,
				status,
				event_count,
			}
		})
		.collect();

	rows.extend(orphans.iter().map(|profile| ClassificationRow {
		subject_id: profile.id,
		email: profile.email.clone(),
		status: ClassificationStatus::OrphanProfile,
		event_count: counts.count_for(profile.id, profile.email.as_deref()),
	}));

	rows
}
