// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use roster_server_config::AnalyzerConfig;
use roster_server_db::{
	AuditTrailRepository, IdentityRepository, LifecycleEventRepository, ProfileRepository,
};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::anomaly::{compute_block_rate, window_start, AnomalyLevel, BlockRateReport};
use crate::blocked::{aggregate_blocked, BlockedEmail, IdentityIndex};
use crate::classify::{classify_subjects, ClassificationRow, EventCounts, HealthSummary};
use crate::error::Result;

/// Read-only reports over identities, profiles, the ledger, and the audit trail.
#[derive(Clone)]
pub struct Analyzer {
	identities: IdentityRepository,
	profiles: ProfileRepository,
	events: LifecycleEventRepository,
	audit: AuditTrailRepository,
	config: AnalyzerConfig,
}

impl Analyzer {
	pub fn new(
		identities: IdentityRepository,
		profiles: ProfileRepository,
		events: LifecycleEventRepository,
		audit: AuditTrailRepository,
		config: AnalyzerConfig,
	) -> Self {
		Self {
			identities,
			profiles,
			events,
			audit,
			config,
		}
	}

	#[tracing::instrument(skip(self))]
	pub async fn classify(&self) -> Result<Vec<ClassificationRow>> {
		let identities = self.identities.list_all().await?;
		let profile_ids: HashSet<_> = self.profiles.list_ids().await?.into_iter().collect();
		let orphans = self.profiles.list_orphans().await?;
		let counts = EventCounts {
			by_subject: self.events.counts_by_subject().await?,
			by_email: self.events.counts_by_email().await?,
		};

		let rows = classify_subjects(&identities, &profile_ids, &orphans, &counts);
		let summary = HealthSummary::from_rows(&rows);
		info!(
			total = summary.total,
			missing_profile = summary.missing_profile,
			missing_lifecycle_event = summary.missing_lifecycle_event,
			orphan_profile = summary.orphan_profile,
			"classified subjects"
		);
		Ok(rows)
	}

	pub async fn health_summary(&self) -> Result<HealthSummary> {
		Ok(HealthSummary::from_rows(&self.classify().await?))
	}

	#[tracing::instrument(skip(self))]
	pub async fn blocked_emails(&self, now: DateTime<Utc>) -> Result<Vec<BlockedEmail>> {
		let entries = self.audit.list_marked(&self.config.blocked_marker).await?;
		let index = IdentityIndex::new(&self.identities.list_all().await?);
		Ok(aggregate_blocked(&entries, &index, &self.config, now))
	}

	#[tracing::instrument(skip(self))]
	pub async fn block_rate_report(&self, now: DateTime<Utc>) -> Result<BlockRateReport> {
		let entries = self
			.audit
			.list_since(window_start(&self.config, now))
			.await?;
		let report = compute_block_rate(&entries, &self.config, now);

		if report.level > AnomalyLevel::None || report.distributed_abuse {
			warn!(
				level = %report.level,
				block_rate = report.block_rate,
				blocked = report.blocked_attempts,
				distinct_sources = report.distinct_blocked_sources,
				distributed_abuse = report.distributed_abuse,
				"signup block rate anomaly"
			);
		}
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::classify::ClassificationStatus;
	use chrono::Duration;
	use roster_provisioning_core::{AccountType, IdentityId, IdentityRecord, LifecycleEventType};
	use roster_server_db::testing::{create_test_pool, disable_foreign_keys};
	use roster_server_db::{AuditTrailEntry, NewLifecycleEvent, ProfileUpsert};

	fn upsert(id: IdentityId, email: &str) -> ProfileUpsert {
		ProfileUpsert {
			id,
			email: Some(email.to_string()),
			full_name: None,
			phone: None,
			account_type: AccountType::Professional,
			account_type_defaulted: true,
			business_name: None,
		}
	}

	#[tokio::test]
	async fn classifies_subjects_from_storage() {
		let pool = create_test_pool().await;
		let identities = IdentityRepository::new(pool.clone());
		let profiles = ProfileRepository::new(pool.clone());
		let events = LifecycleEventRepository::new(pool.clone());
		let analyzer = Analyzer::new(
			identities.clone(),
			profiles.clone(),
			events.clone(),
			AuditTrailRepository::new(pool.clone()),
			AnalyzerConfig::default(),
		);

		let healthy = IdentityRecord::new(IdentityId::generate()).with_email("ok@example.com");
		let by_email = IdentityRecord::new(IdentityId::generate()).with_email("Snap@Example.com");
		let silent = IdentityRecord::new(IdentityId::generate()).with_email("quiet@example.com");
		let bare = IdentityRecord::new(IdentityId::generate()).with_email("bare@example.com");
		for identity in [&healthy, &by_email, &silent, &bare] {
			identities.record(identity).await.unwrap();
		}
		for identity in [&healthy, &by_email, &silent] {
			profiles
				.upsert_fill_blanks(&upsert(identity.id, identity.email.as_deref().unwrap()))
				.await
				.unwrap();
		}
		events
			.append(&NewLifecycleEvent::new(
				healthy.id,
				LifecycleEventType::ProfileBootstrapOk,
			))
			.await
			.unwrap();
		events
			.append(
				&NewLifecycleEvent::new(IdentityId::generate(), LifecycleEventType::IdentityCreated)
					.with_email_snapshot(Some("snap@example.com".to_string())),
			)
			.await
			.unwrap();

		disable_foreign_keys(&pool).await;
		let orphan = IdentityId::generate();
		profiles
			.upsert_fill_blanks(&upsert(orphan, "gone@example.com"))
			.await
			.unwrap();

		let rows = analyzer.classify().await.unwrap();
		let status = |id: IdentityId| rows.iter().find(|r| r.subject_id == id).unwrap().status;
		assert_eq!(status(healthy.id), ClassificationStatus::Healthy);
		assert_eq!(status(by_email.id), ClassificationStatus::Healthy);
		assert_eq!(status(silent.id), ClassificationStatus::MissingLifecycleEvent);
		assert_eq!(status(bare.id), ClassificationStatus::MissingProfile);
		assert_eq!(status(orphan), ClassificationStatus::OrphanProfile);

		let summary = analyzer.health_summary().await.unwrap();
		assert_eq!(summary.total, 5);
		assert_eq!(summary.healthy, 2);
	}

	#[tokio::test]
	async fn reports_blocked_signups_from_audit_trail() {
		let pool = create_test_pool().await;
		let identities = IdentityRepository::new(pool.clone());
		let audit = AuditTrailRepository::new(pool.clone());
		let analyzer = Analyzer::new(
			identities.clone(),
			ProfileRepository::new(pool.clone()),
			LifecycleEventRepository::new(pool.clone()),
			audit.clone(),
			AnalyzerConfig::default(),
		);

		let jane = IdentityRecord::new(IdentityId::generate()).with_email("jane@example.com");
		identities.record(&jane).await.unwrap();

		let now = Utc::now();
		for i in 0..20 {
			let actor = if i < 6 {
				"jane@example.com [blocked]".to_string()
			} else {
				format!("user{i}@example.com")
			};
			audit
				.record(
					&AuditTrailEntry::new("user_signedup", actor)
						.with_source("10.0.0.1")
						.with_created_at(now - Duration::minutes(i)),
				)
				.await
				.unwrap();
		}

		let report = analyzer.block_rate_report(now).await.unwrap();
		assert_eq!(report.total_attempts, 20);
		assert_eq!(report.blocked_attempts, 6);
		assert_eq!(report.level, AnomalyLevel::Warning);
		assert!(!report.distributed_abuse);

		let blocked = analyzer.blocked_emails(now).await.unwrap();
		assert_eq!(blocked.len(), 1);
		assert_eq!(blocked[0].attempts, 6);
		assert_eq!(blocked[0].matched_identity, Some(jane.id));
		assert!(blocked[0].potentially_legitimate);
	}
}
