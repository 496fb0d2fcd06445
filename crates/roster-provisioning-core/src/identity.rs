// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The inbound "identity created" signal and its typed signup metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::IdentityId;

/// An identity as delivered by the authentication provider.
///
/// Only `id` is trusted. Everything else is best-effort user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
	pub id: IdentityId,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub phone: Option<String>,
	#[serde(default)]
	pub metadata: BTreeMap<String, String>,
	#[serde(default = "Utc::now")]
	pub created_at: DateTime<Utc>,
}

impl IdentityRecord {
	pub fn new(id: IdentityId) -> Self {
		Self {
			id,
			email: None,
			phone: None,
			metadata: BTreeMap::new(),
			created_at: Utc::now(),
		}
	}

	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());
		self
	}

	pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
		self.phone = Some(phone.into());
		self
	}

	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
		self.created_at = created_at;
		self
	}

	pub fn signup_metadata(&self) -> SignupMetadata {
		SignupMetadata::from_map(&self.metadata)
	}
}

/// Well-known keys of the provider's signup metadata blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataKey {
	Email,
	ContactEmail,
	FullName,
	Name,
	DisplayName,
	FirstName,
	LastName,
	Phone,
	PhoneNumber,
	AccountType,
	UserType,
	CompanyName,
	BusinessName,
}

impl MetadataKey {
	pub fn all() -> &'static [MetadataKey] {
		&[
			MetadataKey::Email,
			MetadataKey::ContactEmail,
			MetadataKey::FullName,
			MetadataKey::Name,
			MetadataKey::DisplayName,
			MetadataKey::FirstName,
			MetadataKey::LastName,
			MetadataKey::Phone,
			MetadataKey::PhoneNumber,
			MetadataKey::AccountType,
			MetadataKey::UserType,
			MetadataKey::CompanyName,
			MetadataKey::BusinessName,
		]
	}

	/// Spellings seen in the wild. The first entry is canonical.
	pub fn spellings(&self) -> &'static [&'static str] {
		match self {
			MetadataKey::Email => &["email"],
			MetadataKey::ContactEmail => &["contact_email", "contactEmail"],
			MetadataKey::FullName => &["full_name", "fullName"],
			MetadataKey::Name => &["name"],
			MetadataKey::DisplayName => &["display_name", "displayName"],
			MetadataKey::FirstName => &["first_name", "firstName", "given_name"],
			MetadataKey::LastName => &["last_name", "lastName", "family_name"],
			MetadataKey::Phone => &["phone"],
			MetadataKey::PhoneNumber => &["phone_number", "phoneNumber"],
			MetadataKey::AccountType => &["account_type", "accountType"],
			MetadataKey::UserType => &["user_type", "userType"],
			MetadataKey::CompanyName => &["company_name", "companyName", "company"],
			MetadataKey::BusinessName => &["business_name", "businessName"],
		}
	}

	fn for_spelling(key: &str) -> Option<MetadataKey> {
		MetadataKey::all()
			.iter()
			.copied()
			.find(|k| k.spellings().contains(&key))
	}
}

/// Typed view over the provider's string map.
///
/// Values are trimmed and blank values dropped at construction, so every lookup
/// either yields usable text or nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupMetadata {
	known: BTreeMap<MetadataKey, String>,
	/// Keys this subsystem does not interpret, untouched.
	pub extra: BTreeMap<String, String>,
}

impl SignupMetadata {
	pub fn from_map(map: &BTreeMap<String, String>) -> Self {
		let mut metadata = SignupMetadata::default();
		for (key, value) in map {
			let value = value.trim();
			match MetadataKey::for_spelling(key) {
				Some(known) => {
					if value.is_empty() {
						continue;
					}
					// Canonical spelling beats an alias when both are present.
					let canonical = known.spellings()[0] == key.as_str();
					if canonical || !metadata.known.contains_key(&known) {
						metadata.known.insert(known, value.to_string());
					}
				}
				None => {
					metadata.extra.insert(key.clone(), value.to_string());
				}
			}
		}
		metadata
	}

	pub fn get(&self, key: MetadataKey) -> Option<&str> {
		self.known.get(&key).map(String::as_str)
	}

	pub fn is_empty(&self) -> bool {
		self.known.is_empty() && self.extra.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn recognizes_aliases_and_keeps_unknown_keys() {
		let meta = SignupMetadata::from_map(&map(&[
			("fullName", "Jane Doe"),
			("accountType", "investor"),
			("referrer", "newsletter"),
		]));
		assert_eq!(meta.get(MetadataKey::FullName), Some("Jane Doe"));
		assert_eq!(meta.get(MetadataKey::AccountType), Some("investor"));
		assert_eq!(meta.extra.get("referrer").map(String::as_str), Some("newsletter"));
	}

	#[test]
	fn canonical_spelling_wins_over_alias() {
		let meta = SignupMetadata::from_map(&map(&[("full_name", "Canonical"), ("fullName", "Alias")]));
		assert_eq!(meta.get(MetadataKey::FullName), Some("Canonical"));
	}

	#[test]
	fn blank_values_are_dropped() {
		let meta = SignupMetadata::from_map(&map(&[("phone", "   "), ("name", " Jo ")]));
		assert_eq!(meta.get(MetadataKey::Phone), None);
		assert_eq!(meta.get(MetadataKey::Name), Some("Jo"));
	}

	#[test]
	fn identity_deserializes_with_only_id() {
		let id = IdentityId::generate();
		let json = format!(r#"{{"id":"{id}"}}"#);
		let identity: IdentityRecord = serde_json::from_str(&json).unwrap();
		assert_eq!(identity.id, id);
		assert!(identity.email.is_none());
		assert!(identity.metadata.is_empty());
	}
}
