// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core domain types for Roster account provisioning.
//!
//! This crate is storage-agnostic and provides:
//! - [`IdentityRecord`] and [`SignupMetadata`] - the inbound provider signal
//! - [`AccountType`] - the closed canonical account-type set, plus the versioned
//!   normalization table that maps historical values onto it
//! - [`extract_profile_draft`] - data-driven field extraction with explicit precedence
//! - [`LifecycleEventType`] - the unified provisioning event taxonomy
//! - [`Profile`] and [`MergeOutcome`] - the application-owned profile row

pub mod account_type;
pub mod email;
pub mod event;
pub mod extract;
pub mod identity;
pub mod profile;
pub mod types;

pub use account_type::{
	aliases_for, normalize_account_type, resolve_account_type, AccountType, AccountTypeResolution,
	SchemaRevision, UnknownAccountType, UnknownAccountTypePolicy, ACCOUNT_TYPE_ALIASES,
};
pub use email::{email_domain, is_valid_email};
pub use event::LifecycleEventType;
pub use extract::{
	extract_profile_draft, is_placeholder_email, placeholder_email, FieldSource, MetadataKey,
	ProfileDraft, ACCOUNT_TYPE_SOURCES, COMPANY_NAME_SOURCES, EMAIL_SOURCES, FULL_NAME_SOURCES,
	PHONE_SOURCES,
};
pub use identity::{IdentityRecord, SignupMetadata};
pub use profile::{MergeOutcome, Profile};
pub use types::{ErrorRecordId, EventId, IdentityId};
