// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared fixtures for provisioning integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use roster_provisioning_core::{IdentityId, IdentityRecord, MergeOutcome, Profile};
use roster_server_config::{ProvisioningConfig, SweeperConfig};
use roster_server_db::testing::create_test_pool;
use roster_server_db::{
	DbError, ErrorRecordRepository, IdentityRepository, LifecycleEventRepository,
	ProfileRepository, ProfileStore, ProfileUpsert,
};
use roster_server_provisioning::{
	ErrorCapture, EventLedger, ProfileMerger, ProvisioningHook, ReconciliationSweeper,
};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;

pub struct Harness {
	pub pool: SqlitePool,
	pub identities: IdentityRepository,
	pub profiles: ProfileRepository,
	pub events: LifecycleEventRepository,
	pub errors: ErrorRecordRepository,
}

impl Harness {
	pub async fn new() -> Self {
		Self::with_pool(create_test_pool().await)
	}

	pub fn with_pool(pool: SqlitePool) -> Self {
		Self {
			identities: IdentityRepository::new(pool.clone()),
			profiles: ProfileRepository::new(pool.clone()),
			events: LifecycleEventRepository::new(pool.clone()),
			errors: ErrorRecordRepository::new(pool.clone()),
			pool,
		}
	}

	pub fn ledger(&self) -> EventLedger {
		EventLedger::new(Arc::new(self.events.clone()))
	}

	pub fn capture(&self) -> ErrorCapture {
		ErrorCapture::new(Arc::new(self.errors.clone()), self.ledger())
	}

	pub fn merger(&self, config: ProvisioningConfig) -> ProfileMerger {
		ProfileMerger::new(Arc::new(self.profiles.clone()), config)
	}

	pub fn hook(&self) -> ProvisioningHook {
		self.hook_with(self.merger(ProvisioningConfig::default()))
	}

	pub fn hook_with(&self, merger: ProfileMerger) -> ProvisioningHook {
		ProvisioningHook::new(self.ledger(), merger, self.capture())
	}

	pub fn sweeper(&self, config: SweeperConfig) -> ReconciliationSweeper {
		self.sweeper_with(self.merger(ProvisioningConfig::default()), config)
	}

	pub fn sweeper_with(&self, merger: ProfileMerger, config: SweeperConfig) -> ReconciliationSweeper {
		ReconciliationSweeper::new(
			self.identities.clone(),
			merger,
			self.ledger(),
			self.capture(),
			config,
		)
	}

	/// Record `count` identities with strictly increasing `created_at`, oldest first.
	pub async fn seed_identities(&self, count: usize, offset: i64) -> Vec<IdentityRecord> {
		let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
		let mut seeded = Vec::with_capacity(count);
		for i in 0..count {
			let id = IdentityId::generate();
			let identity = IdentityRecord::new(id)
				.with_email(format!("user{}@example.com", offset + i as i64))
				.with_created_at(base + Duration::seconds(offset + i as i64));
			assert!(self.identities.record(&identity).await.unwrap());
			seeded.push(identity);
		}
		seeded
	}

	pub async fn profile(&self, id: IdentityId) -> Option<Profile> {
		self.profiles.get(id).await.unwrap()
	}
}

pub fn sweeper_config(batch_size: u32, max_subjects_per_run: u32) -> SweeperConfig {
	SweeperConfig {
		batch_size,
		max_subjects_per_run,
		..Default::default()
	}
}

/// A profile store that is permanently unavailable.
pub struct FailingProfileStore;

#[async_trait]
impl ProfileStore for FailingProfileStore {
	async fn upsert_fill_blanks(&self, _upsert: &ProfileUpsert) -> roster_server_db::Result<MergeOutcome> {
		Err(DbError::Internal("profiles table is locked".to_string()))
	}

	async fn get(&self, _id: IdentityId) -> roster_server_db::Result<Option<Profile>> {
		Ok(None)
	}
}

/// Fails for selected subjects and delegates everything else to a real repository.
pub struct SelectiveFailureStore {
	pub inner: ProfileRepository,
	pub failing: HashSet<IdentityId>,
}

#[async_trait]
impl ProfileStore for SelectiveFailureStore {
	async fn upsert_fill_blanks(&self, upsert: &ProfileUpsert) -> roster_server_db::Result<MergeOutcome> {
		if self.failing.contains(&upsert.id) {
			return Err(DbError::Internal("constraint violation".to_string()));
		}
		self.inner.upsert_fill_blanks(upsert).await
	}

	async fn get(&self, id: IdentityId) -> roster_server_db::Result<Option<Profile>> {
		ProfileStore::get(&self.inner, id).await
	}
}
