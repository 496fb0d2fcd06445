// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod common;

use common::{sweeper_config, Harness, SelectiveFailureStore};
use roster_provisioning_core::{LifecycleEventType, MergeOutcome};
use roster_server_config::ProvisioningConfig;
use roster_server_provisioning::{ProfileMerger, SweepOutcome};
use std::cell::Cell;
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn converges_missing_profiles_and_leaves_existing_untouched() {
	let harness = Harness::new().await;
	let provisioned = harness.seed_identities(3, 0).await;
	let missing = harness.seed_identities(4, 100).await;

	let hook = harness.hook();
	let mut before = Vec::new();
	for identity in &provisioned {
		hook.on_identity_created(identity).await;
		before.push(harness.profile(identity.id).await.unwrap());
	}

	let run = harness
		.sweeper(sweeper_config(10, 1000))
		.run(|| false)
		.await
		.unwrap();

	let summary = run.summary();
	assert_eq!(summary.visited, 4);
	assert_eq!(summary.created, 4);
	assert_eq!(summary.failed, 0);
	assert!(!summary.cancelled);

	let repaired: Vec<_> = run.reports.iter().map(|r| r.subject_id).collect();
	let expected: Vec<_> = missing.iter().map(|i| i.id).collect();
	assert_eq!(repaired, expected, "oldest identities are repaired first");

	for (identity, profile) in provisioned.iter().zip(before) {
		assert_eq!(harness.profile(identity.id).await.unwrap(), profile);
	}
	for identity in &missing {
		let events = harness.events.list_for_subject(identity.id).await.unwrap();
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].event_type, LifecycleEventType::ReconciliationRepaired);
		assert_eq!(events[0].metadata["outcome"], "created");
	}
	assert_eq!(harness.profiles.count().await.unwrap(), 7);
	assert_eq!(harness.identities.count_missing_profiles().await.unwrap(), 0);
}

#[tokio::test]
async fn rerun_after_convergence_is_a_no_op() {
	let harness = Harness::new().await;
	harness.seed_identities(5, 0).await;
	let sweeper = harness.sweeper(sweeper_config(2, 1000));

	assert_eq!(sweeper.run(|| false).await.unwrap().reports.len(), 5);
	let second = sweeper.run(|| false).await.unwrap();
	assert!(second.reports.is_empty());
	assert!(!second.cancelled);
}

#[tokio::test]
async fn small_batches_cover_every_subject() {
	let harness = Harness::new().await;
	harness.seed_identities(7, 0).await;

	let run = harness
		.sweeper(sweeper_config(3, 1000))
		.run(|| false)
		.await
		.unwrap();
	assert_eq!(run.summary().created, 7);
}

#[tokio::test]
async fn run_is_bounded_by_max_subjects() {
	let harness = Harness::new().await;
	harness.seed_identities(5, 0).await;
	let sweeper = harness.sweeper(sweeper_config(2, 3));

	let first = sweeper.run(|| false).await.unwrap();
	assert_eq!(first.reports.len(), 3);
	assert_eq!(harness.identities.count_missing_profiles().await.unwrap(), 2);

	let second = sweeper.run(|| false).await.unwrap();
	assert_eq!(second.reports.len(), 2);
	assert_eq!(harness.identities.count_missing_profiles().await.unwrap(), 0);
}

#[tokio::test]
async fn cancellation_keeps_completed_repairs_and_resumes() {
	let harness = Harness::new().await;
	harness.seed_identities(5, 0).await;
	let sweeper = harness.sweeper(sweeper_config(10, 1000));

	let checks = Cell::new(0);
	let run = sweeper
		.run(|| {
			checks.set(checks.get() + 1);
			checks.get() > 2
		})
		.await
		.unwrap();
	assert!(run.cancelled);
	assert_eq!(run.reports.len(), 2);
	assert_eq!(harness.profiles.count().await.unwrap(), 2);

	let resumed = sweeper.run(|| false).await.unwrap();
	assert!(!resumed.cancelled);
	assert_eq!(resumed.reports.len(), 3);
	assert_eq!(harness.identities.count_missing_profiles().await.unwrap(), 0);
}

#[tokio::test]
async fn failing_subject_is_isolated_and_not_reread() {
	let harness = Harness::new().await;
	let identities = harness.seed_identities(4, 0).await;
	let bad = identities[1].id;

	let store = SelectiveFailureStore {
		inner: harness.profiles.clone(),
		failing: HashSet::from([bad]),
	};
	let sweeper = harness.sweeper_with(
		ProfileMerger::new(Arc::new(store), ProvisioningConfig::default()),
		sweeper_config(1, 1000),
	);

	let run = sweeper.run(|| false).await.unwrap();
	assert_eq!(run.reports.len(), 4, "each subject is visited exactly once");

	let failed: Vec<_> = run
		.reports
		.iter()
		.filter(|r| matches!(r.outcome, SweepOutcome::Failed { .. }))
		.collect();
	assert_eq!(failed.len(), 1);
	assert_eq!(failed[0].subject_id, bad);
	let SweepOutcome::Failed { error_id, .. } = &failed[0].outcome else {
		unreachable!();
	};

	let records = harness.errors.list_for_subject(bad).await.unwrap();
	assert_eq!(records.len(), 1);
	assert_eq!(Some(records[0].id), *error_id);
	assert_eq!(records[0].context["stage"], "sweeper");

	let events = harness.events.list_for_subject(bad).await.unwrap();
	assert_eq!(events.len(), 1);
	assert_eq!(events[0].event_type, LifecycleEventType::ReconciliationFailed);

	assert_eq!(harness.identities.count_missing_profiles().await.unwrap(), 1);
	assert_eq!(run.summary().created, 3);
}

#[tokio::test]
async fn sweeper_fills_gaps_left_by_deferred_hook() {
	let harness = Harness::new().await;
	let identity = harness.seed_identities(1, 0).await.remove(0);

	let failing = SelectiveFailureStore {
		inner: harness.profiles.clone(),
		failing: HashSet::from([identity.id]),
	};
	let hook = harness.hook_with(ProfileMerger::new(
		Arc::new(failing),
		ProvisioningConfig::default(),
	));
	assert!(!hook.on_identity_created(&identity).await.is_provisioned());

	let run = harness
		.sweeper(sweeper_config(10, 1000))
		.run(|| false)
		.await
		.unwrap();
	assert_eq!(run.reports.len(), 1);
	assert_eq!(
		run.reports[0].outcome,
		SweepOutcome::Repaired {
			outcome: MergeOutcome::Created
		}
	);
	assert!(harness.profile(identity.id).await.is_some());
}
