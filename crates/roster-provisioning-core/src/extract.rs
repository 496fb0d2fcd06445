// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort extraction of profile fields from an identity.
//!
//! Extraction rules are data: each profile field has an ordered list of
//! [`FieldSource`]s and the first one yielding non-blank text wins. Changing where a
//! field comes from means editing a table, not adding a conditional.

use serde::{Deserialize, Serialize};

use crate::identity::{IdentityRecord, SignupMetadata};
use crate::types::IdentityId;

pub use crate::identity::MetadataKey;

const PLACEHOLDER_EMAIL_PREFIX: &str = "missing-email-";
const PLACEHOLDER_EMAIL_SUFFIX: &str = "@invalid";

/// Where a candidate value can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
	IdentityEmail,
	IdentityPhone,
	Metadata(MetadataKey),
	/// `first_name` and `last_name` joined by a space; either may be absent.
	GivenAndFamilyName,
}

pub const EMAIL_SOURCES: &[FieldSource] = &[
	FieldSource::IdentityEmail,
	FieldSource::Metadata(MetadataKey::Email),
	FieldSource::Metadata(MetadataKey::ContactEmail),
];

pub const FULL_NAME_SOURCES: &[FieldSource] = &[
	FieldSource::Metadata(MetadataKey::FullName),
	FieldSource::Metadata(MetadataKey::Name),
	FieldSource::Metadata(MetadataKey::DisplayName),
	FieldSource::GivenAndFamilyName,
];

pub const PHONE_SOURCES: &[FieldSource] = &[
	FieldSource::IdentityPhone,
	FieldSource::Metadata(MetadataKey::Phone),
	FieldSource::Metadata(MetadataKey::PhoneNumber),
];

pub const ACCOUNT_TYPE_SOURCES: &[FieldSource] = &[
	FieldSource::Metadata(MetadataKey::AccountType),
	FieldSource::Metadata(MetadataKey::UserType),
];

pub const COMPANY_NAME_SOURCES: &[FieldSource] = &[
	FieldSource::Metadata(MetadataKey::CompanyName),
	FieldSource::Metadata(MetadataKey::BusinessName),
];

impl FieldSource {
	fn read(&self, identity: &IdentityRecord, metadata: &SignupMetadata) -> Option<String> {
		let value = match self {
			FieldSource::IdentityEmail => identity.email.as_deref().map(str::to_string),
			FieldSource::IdentityPhone => identity.phone.as_deref().map(str::to_string),
			FieldSource::Metadata(key) => metadata.get(*key).map(str::to_string),
			FieldSource::GivenAndFamilyName => {
				let parts: Vec<&str> = [MetadataKey::FirstName, MetadataKey::LastName]
					.iter()
					.filter_map(|k| metadata.get(*k))
					.collect();
				Some(parts.join(" "))
			}
		};
		value
			.map(|v| v.trim().to_string())
			.filter(|v| !v.is_empty())
	}
}

fn first_present(
	sources: &[FieldSource],
	identity: &IdentityRecord,
	metadata: &SignupMetadata,
) -> Option<String> {
	sources.iter().find_map(|s| s.read(identity, metadata))
}

/// Placeholder used when no email can be found for a subject.
pub fn placeholder_email(id: IdentityId) -> String {
	format!("{PLACEHOLDER_EMAIL_PREFIX}{id}{PLACEHOLDER_EMAIL_SUFFIX}")
}

pub fn is_placeholder_email(email: &str) -> bool {
	email.starts_with(PLACEHOLDER_EMAIL_PREFIX) && email.ends_with(PLACEHOLDER_EMAIL_SUFFIX)
}

/// Partial, untrusted input to the profile merge.
///
/// `None` means "no claim" for that field; the merge never clears a stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDraft {
	pub subject_id: IdentityId,
	pub email: Option<String>,
	pub full_name: Option<String>,
	pub phone: Option<String>,
	/// Raw account type as supplied; resolved against the closed set by the merge.
	pub account_type: Option<String>,
	pub company_name: Option<String>,
}

impl ProfileDraft {
	pub fn new(subject_id: IdentityId) -> Self {
		Self {
			subject_id,
			email: None,
			full_name: None,
			phone: None,
			account_type: None,
			company_name: None,
		}
	}

	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());
		self
	}

	pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
		self.full_name = Some(full_name.into());
		self
	}

	pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
		self.phone = Some(phone.into());
		self
	}

	pub fn with_account_type(mut self, account_type: impl Into<String>) -> Self {
		self.account_type = Some(account_type.into());
		self
	}

	pub fn with_company_name(mut self, company_name: impl Into<String>) -> Self {
		self.company_name = Some(company_name.into());
		self
	}

	/// True when the email is a synthesized placeholder rather than a real address.
	pub fn has_placeholder_email(&self) -> bool {
		self.email.as_deref().is_some_and(is_placeholder_email)
	}
}

/// Extract a draft from an identity using the precedence tables above.
///
/// Email always ends up populated: the placeholder `missing-email-<id>@invalid` is
/// synthesized as the last resort. A missing full name falls back to the local part
/// of a real email address.
pub fn extract_profile_draft(identity: &IdentityRecord) -> ProfileDraft {
	let metadata = identity.signup_metadata();

	let email = first_present(EMAIL_SOURCES, identity, &metadata);
	let full_name = first_present(FULL_NAME_SOURCES, identity, &metadata).or_else(|| {
		email
			.as_deref()
			.and_then(|e| e.split_once('@'))
			.map(|(local, _)| local.to_string())
			.filter(|local| !local.is_empty())
	});

	ProfileDraft {
		subject_id: identity.id,
		email: Some(email.unwrap_or_else(|| placeholder_email(identity.id))),
		full_name,
		phone: first_present(PHONE_SOURCES, identity, &metadata),
		account_type: first_present(ACCOUNT_TYPE_SOURCES, identity, &metadata),
		company_name: first_present(COMPANY_NAME_SOURCES, identity, &metadata),
	}
}
