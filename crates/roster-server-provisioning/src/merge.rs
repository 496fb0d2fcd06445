// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Profile merge engine.
//!
//! Turns an untrusted [`ProfileDraft`] into a validated [`ProfileUpsert`] and hands it
//! to the store's atomic fill-blanks upsert. Validation here never touches the
//! database: blank strings become "no claim" and the account type is resolved
//! against the closed set before anything is written.

use roster_provisioning_core::{resolve_account_type, MergeOutcome, ProfileDraft};
use roster_server_config::ProvisioningConfig;
use roster_server_db::{ProfileStore, ProfileUpsert};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;

#[derive(Clone)]
pub struct ProfileMerger {
	store: Arc<dyn ProfileStore>,
	config: ProvisioningConfig,
}

fn non_blank(value: &Option<String>) -> Option<String> {
	value
		.as_deref()
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.map(str::to_string)
}

impl ProfileMerger {
	pub fn new(store: Arc<dyn ProfileStore>, config: ProvisioningConfig) -> Self {
		Self { store, config }
	}

	/// Validate a draft into the exact row values the store will merge.
	pub fn prepare(&self, draft: &ProfileDraft) -> Result<ProfileUpsert> {
		let resolution = resolve_account_type(
			draft.account_type.as_deref(),
			self.config.default_account_type,
			self.config.unknown_account_type_policy,
		)?;

		Ok(ProfileUpsert {
			id: draft.subject_id,
			email: non_blank(&draft.email),
			full_name: non_blank(&draft.full_name),
			phone: non_blank(&draft.phone),
			account_type: resolution.account_type,
			account_type_defaulted: resolution.defaulted,
			business_name: non_blank(&draft.company_name),
		})
	}

	/// Ensure a profile exists for the draft's subject, filling blank fields only.
	///
	/// Safe to call any number of times, concurrently, in any order: stored non-empty
	/// values are never overwritten and identical input is a no-op.
	#[tracing::instrument(skip(self, draft), fields(subject_id = %draft.subject_id))]
	pub async fn ensure_profile(&self, draft: &ProfileDraft) -> Result<MergeOutcome> {
		let upsert = self.prepare(draft)?;
		let outcome = self.store.upsert_fill_blanks(&upsert).await?;
		debug!(
			outcome = %outcome,
			account_type = %upsert.account_type,
			account_type_defaulted = upsert.account_type_defaulted,
			"profile merged"
		);
		Ok(outcome)
	}
}
