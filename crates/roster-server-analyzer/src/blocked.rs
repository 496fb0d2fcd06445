// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Blocked-signup aggregation.
//!
//! The provider records a refused signup by appending a marker to the audit entry's
//! actor, e.g. `"jane@example.com [blocked]"`. Repeated attempts from one address and a
//! few sources look like a real person stuck behind a filter; those are flagged as
//! potentially legitimate for manual review.

use chrono::{DateTime, Duration, Utc};
use roster_provisioning_core::{email_domain, is_valid_email, IdentityId, IdentityRecord};
use roster_server_config::AnalyzerConfig;
use roster_server_db::AuditTrailEntry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Strip the blocked marker from an actor label.
///
/// Returns `None` when the marker is absent or nothing but whitespace remains.
pub fn extract_blocked_email(actor: &str, marker: &str) -> Option<String> {
	if marker.is_empty() {
		return None;
	}
	let position = actor
		.to_ascii_lowercase()
		.find(&marker.to_ascii_lowercase())?;
	let mut stripped = String::with_capacity(actor.len());
	stripped.push_str(&actor[..position]);
	stripped.push_str(&actor[position + marker.len()..]);

	let email = stripped.trim();
	(!email.is_empty()).then(|| email.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedEmail {
	/// Lowercased address.
	pub email: String,
	pub attempts: u32,
	pub distinct_sources: u32,
	pub first_seen: DateTime<Utc>,
	pub last_seen: DateTime<Utc>,
	/// Seconds between first and last attempt.
	pub span_secs: i64,
	pub matched_identity: Option<IdentityId>,
	pub potentially_legitimate: bool,
}

/// Lookup of known identities by id and by lowercase email.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
	ids: HashSet<IdentityId>,
	by_email: HashMap<String, IdentityId>,
}

impl IdentityIndex {
	pub fn new(identities: &[IdentityRecord]) -> Self {
		let mut index = IdentityIndex::default();
		for identity in identities {
			index.ids.insert(identity.id);
			if let Some(email) = identity.email.as_deref() {
				index
					.by_email
					.entry(email.trim().to_lowercase())
					.or_insert(identity.id);
			}
		}
		index
	}

	/// Prefer a known actor id; otherwise match on email.
	pub fn resolve(&self, actor_id: Option<IdentityId>, email: &str) -> Option<IdentityId> {
		actor_id
			.filter(|id| self.ids.contains(id))
			.or_else(|| self.by_email.get(email).copied())
	}
}

pub fn is_disposable(email: &str, disposable_domains: &[String]) -> bool {
	let Some(domain) = email_domain(email) else {
		return false;
	};
	disposable_domains
		.iter()
		.any(|d| !d.is_empty() && domain.contains(&d.to_ascii_lowercase()))
}

fn is_potentially_legitimate(
	email: &str,
	attempts: u32,
	distinct_sources: u32,
	last_seen: DateTime<Utc>,
	config: &AnalyzerConfig,
	now: DateTime<Utc>,
) -> bool {
	(config.legit_min_attempts..=config.legit_max_attempts).contains(&attempts)
		&& is_valid_email(email)
		&& !is_disposable(email, &config.disposable_domains)
		&& distinct_sources <= config.legit_max_sources
		&& last_seen >= recent_cutoff(config, now)
}

fn recent_cutoff(config: &AnalyzerConfig, now: DateTime<Utc>) -> DateTime<Utc> {
	now.checked_sub_signed(Duration::days(i64::from(config.legit_recent_days)))
		.unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Default)]
struct Accumulator<'a> {
	attempts: u32,
	sources: HashSet<&'a str>,
	first_seen: Option<DateTime<Utc>>,
	last_seen: Option<DateTime<Utc>>,
	actor_id: Option<IdentityId>,
}

/// Aggregate blocked entries by lowercase email, most attempts first.
pub fn aggregate_blocked(
	entries: &[AuditTrailEntry],
	identities: &IdentityIndex,
	config: &AnalyzerConfig,
	now: DateTime<Utc>,
) -> Vec<BlockedEmail> {
	let mut by_email: BTreeMap<String, Accumulator<'_>> = BTreeMap::new();

	for entry in entries {
		let Some(email) = extract_blocked_email(&entry.actor, &config.blocked_marker) else {
			continue;
		};
		let acc = by_email.entry(email.to_lowercase()).or_default();
		acc.attempts += 1;
		if let Some(source) = entry.source.as_deref() {
			acc.sources.insert(source);
		}
		acc.first_seen = Some(acc.first_seen.map_or(entry.created_at, |t| t.min(entry.created_at)));
		acc.last_seen = Some(acc.last_seen.map_or(entry.created_at, |t| t.max(entry.created_at)));
		if acc.actor_id.is_none() {
			acc.actor_id = entry.actor_id;
		}
	}

	let mut blocked: Vec<BlockedEmail> = by_email
		.into_iter()
		.filter_map(|(email, acc)| {
			let first_seen = acc.first_seen?;
			let last_seen = acc.last_seen?;
			let distinct_sources = acc.sources.len() as u32;
			Some(BlockedEmail {
				matched_identity: identities.resolve(acc.actor_id, &email),
				potentially_legitimate: is_potentially_legitimate(
					&email,
					acc.attempts,
					distinct_sources,
					last_seen,
					config,
					now,
				),
				attempts: acc.attempts,
				distinct_sources,
				first_seen,
				last_seen,
				span_secs: (last_seen - first_seen).num_seconds(),
				email,
			})
		})
		.collect();

	blocked.sort_by(|a, b| b.attempts.cmp(&a.attempts).then_with(|| a.email.cmp(&b.email)));
	blocked
}
