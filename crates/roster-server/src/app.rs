// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Service wiring shared by every subcommand.

use roster_provisioning_core::IdentityRecord;
use roster_server_analyzer::Analyzer;
use roster_server_config::ServerConfig;
use roster_server_db::{
	create_pool, run_migrations, AuditTrailRepository, ErrorRecordRepository,
	IdentityRepository, JobRepository, LifecycleEventRepository, ProfileRepository,
};
use roster_server_provisioning::{
	ErrorCapture, ErrorTriage, EventLedger, HookOutcome, ProfileMerger, ProvisioningHook,
	ReconciliationSweeper,
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct App {
	pub pool: SqlitePool,
	pub identities: IdentityRepository,
	pub profiles: ProfileRepository,
	pub events: LifecycleEventRepository,
	pub jobs: Arc<JobRepository>,
	pub hook: ProvisioningHook,
	pub sweeper: ReconciliationSweeper,
	pub triage: ErrorTriage,
	pub analyzer: Analyzer,
}

/// Result of ingesting one identity-created signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestResult {
	/// False when the identity was already stored.
	pub recorded: bool,
	pub outcome: HookOutcome,
}

impl App {
	/// Open the configured database and apply migrations.
	pub async fn connect(config: &ServerConfig) -> roster_server_db::Result<Self> {
		let pool = create_pool(&config.database.url).await?;
		run_migrations(&pool).await?;
		Ok(Self::from_pool(pool, config))
	}

	pub fn from_pool(pool: SqlitePool, config: &ServerConfig) -> Self {
		let identities = IdentityRepository::new(pool.clone());
		let profiles = ProfileRepository::new(pool.clone());
		let events = LifecycleEventRepository::new(pool.clone());
		let errors = ErrorRecordRepository::new(pool.clone());

		let ledger = EventLedger::new(Arc::new(events.clone()));
		let capture = ErrorCapture::new(Arc::new(errors.clone()), ledger.clone());
		let merger = ProfileMerger::new(Arc::new(profiles.clone()), config.provisioning);

		Self {
			hook: ProvisioningHook::new(ledger.clone(), merger.clone(), capture.clone()),
			sweeper: ReconciliationSweeper::new(
				identities.clone(),
				merger,
				ledger,
				capture,
				config.sweeper,
			),
			triage: ErrorTriage::new(errors),
			analyzer: Analyzer::new(
				identities.clone(),
				profiles.clone(),
				events.clone(),
				AuditTrailRepository::new(pool.clone()),
				config.analyzer.clone(),
			),
			jobs: Arc::new(JobRepository::new(pool.clone())),
			identities,
			profiles,
			events,
			pool,
		}
	}

	/// Store an identity the way the provider would, then fire the hook.
	///
	/// The hook runs even for an identity that was already stored, so replaying a
	/// signal is safe.
	#[tracing::instrument(skip(self, identity), fields(subject_id = %identity.id))]
	pub async fn ingest(&self, identity: &IdentityRecord) -> roster_server_db::Result<IngestResult> {
		let recorded = self.identities.record(identity).await?;
		let outcome = self.hook.on_identity_created(identity).await;
		Ok(IngestResult { recorded, outcome })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use roster_provisioning_core::{IdentityId, MergeOutcome};
	use roster_server_config::DatabaseConfig;
	use tempfile::TempDir;

	#[tokio::test]
	async fn connect_migrates_and_ingests() {
		let dir = TempDir::new().unwrap();
		let config = ServerConfig {
			database: DatabaseConfig {
				url: format!("sqlite:{}", dir.path().join("roster.db").display()),
			},
			..Default::default()
		};
		let app = App::connect(&config).await.unwrap();

		let identity = IdentityRecord::new(IdentityId::generate()).with_email("a@x.com");
		let first = app.ingest(&identity).await.unwrap();
		assert!(first.recorded);
		assert_eq!(first.outcome, HookOutcome::Provisioned(MergeOutcome::Created));

		let replay = app.ingest(&identity).await.unwrap();
		assert!(!replay.recorded);
		assert_eq!(replay.outcome, HookOutcome::Provisioned(MergeOutcome::Unchanged));
		assert_eq!(app.profiles.count().await.unwrap(), 1);
	}
}
