// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reactive provisioning on identity creation.

use roster_provisioning_core::{
	extract_profile_draft, ErrorRecordId, IdentityRecord, LifecycleEventType, MergeOutcome,
	ProfileDraft,
};
use serde_json::json;
use tracing::{info, warn};

use crate::errors::ErrorCapture;
use crate::ledger::EventLedger;
use crate::merge::ProfileMerger;

/// Result of one hook invocation. The hook itself never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
	Provisioned(MergeOutcome),
	/// The profile was not written; the sweeper will retry. `error_id` is `None` only
	/// when the error record itself could not be stored.
	Deferred { error_id: Option<ErrorRecordId> },
}

impl HookOutcome {
	pub fn is_provisioned(&self) -> bool {
		matches!(self, HookOutcome::Provisioned(_))
	}
}

/// Summary of a draft stored alongside failures. Presence only, no personal data
/// beyond what the record already references.
pub(crate) fn draft_summary(draft: &ProfileDraft) -> serde_json::Value {
	json!({
		"has_email": draft.email.is_some(),
		"placeholder_email": draft.has_placeholder_email(),
		"has_full_name": draft.full_name.is_some(),
		"has_phone": draft.phone.is_some(),
		"account_type": draft.account_type,
		"has_company_name": draft.company_name.is_some(),
	})
}

#[derive(Clone)]
pub struct ProvisioningHook {
	ledger: EventLedger,
	merger: ProfileMerger,
	errors: ErrorCapture,
}

impl ProvisioningHook {
	pub fn new(ledger: EventLedger, merger: ProfileMerger, errors: ErrorCapture) -> Self {
		Self {
			ledger,
			merger,
			errors,
		}
	}

	/// Provision a profile for a freshly created identity.
	///
	/// Fail-open: a merge failure is recorded once as an error record plus a
	/// `profile_bootstrap_error` event and reported as [`HookOutcome::Deferred`].
	#[tracing::instrument(skip(self, identity), fields(subject_id = %identity.id))]
	pub async fn on_identity_created(&self, identity: &IdentityRecord) -> HookOutcome {
		let draft = extract_profile_draft(identity);
		let email = draft.email.as_deref();

		self
			.ledger
			.append(
				identity.id,
				LifecycleEventType::IdentityCreated,
				email,
				json!({ "placeholder_email": draft.has_placeholder_email() }),
			)
			.await;

		match self.merger.ensure_profile(&draft).await {
			Ok(outcome) => {
				self
					.ledger
					.append(
						identity.id,
						LifecycleEventType::ProfileBootstrapOk,
						email,
						json!({ "outcome": outcome.as_str() }),
					)
					.await;
				info!(outcome = %outcome, "profile provisioned");
				HookOutcome::Provisioned(outcome)
			}
			Err(e) => {
				warn!(error = %e, kind = e.kind(), "profile provisioning deferred");
				let error_id = self
					.errors
					.record(
						Some(identity.id),
						"profile bootstrap failed",
						&e.to_string(),
						json!({
							"stage": "hook",
							"error_kind": e.kind(),
							"draft": draft_summary(&draft),
						}),
					)
					.await;
				self
					.ledger
					.append(
						identity.id,
						LifecycleEventType::ProfileBootstrapError,
						email,
						json!({
							"error_kind": e.kind(),
							"error_id": error_id.map(|id| id.to_string()),
						}),
					)
					.await;
				HookOutcome::Deferred { error_id }
			}
		}
	}
}
