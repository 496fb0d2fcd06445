// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod common;

use common::{FailingProfileStore, Harness};
use roster_provisioning_core::{
	AccountType, IdentityId, IdentityRecord, LifecycleEventType, MergeOutcome,
	UnknownAccountTypePolicy,
};
use roster_server_config::ProvisioningConfig;
use roster_server_db::{ErrorRecordStore, NewErrorRecord};
use roster_server_provisioning::{
	ErrorCapture, HookOutcome, ProfileMerger, ProvisioningHook,
};
use std::sync::Arc;

fn event_types(events: &[roster_server_db::LifecycleEvent]) -> Vec<LifecycleEventType> {
	events.iter().map(|e| e.event_type).collect()
}

#[tokio::test]
async fn provisions_profile_from_signup_metadata() {
	let harness = Harness::new().await;
	let identity = IdentityRecord::new(IdentityId::generate())
		.with_email("ada@example.com")
		.with_metadata("first_name", "Ada")
		.with_metadata("last_name", "Lovelace")
		.with_metadata("user_type", "investor")
		.with_metadata("company_name", "Analytical Engines");
	harness.identities.record(&identity).await.unwrap();

	let outcome = harness.hook().on_identity_created(&identity).await;
	assert_eq!(outcome, HookOutcome::Provisioned(MergeOutcome::Created));

	let profile = harness.profile(identity.id).await.unwrap();
	assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
	assert_eq!(profile.full_name.as_deref(), Some("Ada Lovelace"));
	assert_eq!(profile.account_type, AccountType::Investor);
	assert!(!profile.account_type_defaulted);
	assert_eq!(profile.business_name.as_deref(), Some("Analytical Engines"));

	let events = harness.events.list_for_subject(identity.id).await.unwrap();
	assert_eq!(
		event_types(&events),
		vec![
			LifecycleEventType::IdentityCreated,
			LifecycleEventType::ProfileBootstrapOk
		]
	);
	assert_eq!(events[1].metadata["outcome"], "created");
	assert_eq!(events[1].email_snapshot.as_deref(), Some("ada@example.com"));
}

#[tokio::test]
async fn repeated_signal_is_idempotent() {
	let harness = Harness::new().await;
	let identity = IdentityRecord::new(IdentityId::generate()).with_email("a@x.com");
	harness.identities.record(&identity).await.unwrap();
	let hook = harness.hook();

	assert_eq!(
		hook.on_identity_created(&identity).await,
		HookOutcome::Provisioned(MergeOutcome::Created)
	);
	let first = harness.profile(identity.id).await.unwrap();
	assert_eq!(
		hook.on_identity_created(&identity).await,
		HookOutcome::Provisioned(MergeOutcome::Unchanged)
	);
	assert_eq!(harness.profile(identity.id).await.unwrap(), first);
	assert_eq!(harness.profiles.count().await.unwrap(), 1);
}

#[tokio::test]
async fn missing_email_gets_placeholder_until_a_real_one_arrives() {
	let harness = Harness::new().await;
	let id = IdentityId::generate();
	let bare = IdentityRecord::new(id);
	harness.identities.record(&bare).await.unwrap();
	let hook = harness.hook();

	hook.on_identity_created(&bare).await;
	let profile = harness.profile(id).await.unwrap();
	assert_eq!(profile.email, Some(format!("missing-email-{id}@invalid")));
	assert_eq!(profile.account_type, AccountType::Professional);
	assert!(profile.account_type_defaulted);

	let outcome = hook
		.on_identity_created(&bare.clone().with_email("late@example.com"))
		.await;
	assert_eq!(outcome, HookOutcome::Provisioned(MergeOutcome::Enriched));
	let profile = harness.profile(id).await.unwrap();
	assert_eq!(profile.email.as_deref(), Some("late@example.com"));
	assert_eq!(profile.full_name.as_deref(), Some("late"));
}

#[tokio::test]
async fn persistence_failure_fails_open_with_one_error_record() {
	let harness = Harness::new().await;
	let identity = IdentityRecord::new(IdentityId::generate()).with_email("a@x.com");
	harness.identities.record(&identity).await.unwrap();
	let hook = harness.hook_with(ProfileMerger::new(
		Arc::new(FailingProfileStore),
		ProvisioningConfig::default(),
	));

	let outcome = hook.on_identity_created(&identity).await;
	let HookOutcome::Deferred { error_id } = outcome else {
		panic!("expected deferred outcome, got {outcome:?}");
	};

	let records = harness.errors.list_for_subject(identity.id).await.unwrap();
	assert_eq!(records.len(), 1);
	assert_eq!(Some(records[0].id), error_id);
	assert_eq!(records[0].subject_id, Some(identity.id));
	assert_eq!(records[0].context["stage"], "hook");
	assert_eq!(records[0].context["error_kind"], "database");
	assert_eq!(records[0].context["draft"]["has_email"], true);
	assert!(harness.profile(identity.id).await.is_none());

	let events = harness.events.list_for_subject(identity.id).await.unwrap();
	assert_eq!(
		event_types(&events),
		vec![
			LifecycleEventType::IdentityCreated,
			LifecycleEventType::ProfileBootstrapError
		]
	);
}

#[tokio::test]
async fn reject_policy_defers_unknown_account_type() {
	let harness = Harness::new().await;
	let identity = IdentityRecord::new(IdentityId::generate())
		.with_email("a@x.com")
		.with_metadata("account_type", "astronaut");
	harness.identities.record(&identity).await.unwrap();
	let hook = harness.hook_with(harness.merger(ProvisioningConfig {
		unknown_account_type_policy: UnknownAccountTypePolicy::Reject,
		..Default::default()
	}));

	let outcome = hook.on_identity_created(&identity).await;
	assert!(matches!(outcome, HookOutcome::Deferred { error_id: Some(_) }));

	let records = harness.errors.list_for_subject(identity.id).await.unwrap();
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].context["error_kind"], "invalid_account_type");
	assert!(records[0].detail.contains("astronaut"));
	assert!(harness.profile(identity.id).await.is_none());
}

#[tokio::test]
async fn coerce_policy_provisions_unknown_account_type_as_default() {
	let harness = Harness::new().await;
	let identity = IdentityRecord::new(IdentityId::generate())
		.with_email("a@x.com")
		.with_metadata("account_type", "astronaut");
	harness.identities.record(&identity).await.unwrap();

	let outcome = harness.hook().on_identity_created(&identity).await;
	assert_eq!(outcome, HookOutcome::Provisioned(MergeOutcome::Created));
	let profile = harness.profile(identity.id).await.unwrap();
	assert_eq!(profile.account_type, AccountType::Professional);
	assert!(profile.account_type_defaulted);
}

struct UnwritableErrors;

#[async_trait::async_trait]
impl ErrorRecordStore for UnwritableErrors {
	async fn insert(
		&self,
		_record: &NewErrorRecord,
	) -> roster_server_db::Result<roster_provisioning_core::ErrorRecordId> {
		Err(roster_server_db::DbError::Internal("error table missing".to_string()))
	}
}

#[tokio::test]
async fn lost_error_record_is_still_observable() {
	let harness = Harness::new().await;
	let identity = IdentityRecord::new(IdentityId::generate()).with_email("a@x.com");
	harness.identities.record(&identity).await.unwrap();
	let hook = ProvisioningHook::new(
		harness.ledger(),
		ProfileMerger::new(Arc::new(FailingProfileStore), ProvisioningConfig::default()),
		ErrorCapture::new(Arc::new(UnwritableErrors), harness.ledger()),
	);

	let outcome = hook.on_identity_created(&identity).await;
	assert_eq!(outcome, HookOutcome::Deferred { error_id: None });

	let events = harness.events.list_for_subject(identity.id).await.unwrap();
	assert_eq!(
		event_types(&events),
		vec![
			LifecycleEventType::IdentityCreated,
			LifecycleEventType::ErrorCaptureFailed,
			LifecycleEventType::ProfileBootstrapError
		]
	);
}
