// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Account types and their versioned normalization table.
//!
//! The set of account types has been renamed and widened several times. Rather than
//! rewriting stored values per release, every raw value ever accepted is kept in
//! [`ACCOUNT_TYPE_ALIASES`] together with the revision that introduced it, and is
//! reduced to the current canonical [`AccountType`] at merge time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical account types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
	Sme,
	Professional,
	Investor,
	Donor,
	Government,
	SoleProprietor,
}

impl AccountType {
	pub fn all() -> &'static [AccountType] {
		&[
			AccountType::Sme,
			AccountType::Professional,
			AccountType::Investor,
			AccountType::Donor,
			AccountType::Government,
			AccountType::SoleProprietor,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AccountType::Sme => "sme",
			AccountType::Professional => "professional",
			AccountType::Investor => "investor",
			AccountType::Donor => "donor",
			AccountType::Government => "government",
			AccountType::SoleProprietor => "sole_proprietor",
		}
	}
}

impl fmt::Display for AccountType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Parses the canonical spelling only. Use [`normalize_account_type`] for raw input.
impl FromStr for AccountType {
	type Err = UnknownAccountType;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		AccountType::all()
			.iter()
			.copied()
			.find(|t| t.as_str() == s)
			.ok_or_else(|| UnknownAccountType(s.to_string()))
	}
}

/// Schema revisions of the account-type enum, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SchemaRevision {
	/// Launch set: business-vs-individual split plus investors and donors.
	V1,
	/// Government accounts added.
	V2,
	/// `business` renamed to `sme`; donor and professional synonyms widened.
	V3,
	/// Sole proprietors split out of `sme`.
	V4,
}

impl SchemaRevision {
	pub const CURRENT: SchemaRevision = SchemaRevision::V4;
}

/// Every raw value accepted at some revision, and the canonical type it reduces to today.
///
/// Keys are stored pre-folded (see [`normalize_account_type`]).
pub const ACCOUNT_TYPE_ALIASES: &[(&str, AccountType, SchemaRevision)] = &[
	("business", AccountType::Sme, SchemaRevision::V1),
	("company", AccountType::Sme, SchemaRevision::V1),
	("individual", AccountType::Professional, SchemaRevision::V1),
	("personal", AccountType::Professional, SchemaRevision::V1),
	("professional", AccountType::Professional, SchemaRevision::V1),
	("investor", AccountType::Investor, SchemaRevision::V1),
	("donor", AccountType::Donor, SchemaRevision::V1),
	("government", AccountType::Government, SchemaRevision::V2),
	("public_sector", AccountType::Government, SchemaRevision::V2),
	("agency", AccountType::Government, SchemaRevision::V2),
	("angel", AccountType::Investor, SchemaRevision::V2),
	("angel_investor", AccountType::Investor, SchemaRevision::V2),
	("sme", AccountType::Sme, SchemaRevision::V3),
	("small_business", AccountType::Sme, SchemaRevision::V3),
	("startup", AccountType::Sme, SchemaRevision::V3),
	("charity", AccountType::Donor, SchemaRevision::V3),
	("philanthropist", AccountType::Donor, SchemaRevision::V3),
	("consultant", AccountType::Professional, SchemaRevision::V3),
	("expert", AccountType::Professional, SchemaRevision::V3),
	("sole_proprietor", AccountType::SoleProprietor, SchemaRevision::V4),
	("soleproprietor", AccountType::SoleProprietor, SchemaRevision::V4),
	("sole_trader", AccountType::SoleProprietor, SchemaRevision::V4),
	("freelancer", AccountType::SoleProprietor, SchemaRevision::V4),
	("self_employed", AccountType::SoleProprietor, SchemaRevision::V4),
];

/// Aliases that were accepted at or before `revision`.
pub fn aliases_for(revision: SchemaRevision) -> impl Iterator<Item = (&'static str, AccountType)> {
	ACCOUNT_TYPE_ALIASES
		.iter()
		.filter(move |(_, _, introduced)| *introduced <= revision)
		.map(|(alias, canonical, _)| (*alias, *canonical))
}

fn fold(raw: &str) -> String {
	let mut folded = String::with_capacity(raw.len());
	let mut pending_sep = false;
	for c in raw.trim().chars() {
		if c == '-' || c == '_' || c.is_whitespace() {
			pending_sep = true;
			continue;
		}
		if pending_sep && !folded.is_empty() {
			folded.push('_');
		}
		pending_sep = false;
		folded.extend(c.to_lowercase());
	}
	folded
}

/// Reduce any historical raw value to the current canonical account type.
///
/// Returns `None` for blank or unrecognized input.
pub fn normalize_account_type(raw: &str) -> Option<AccountType> {
	let key = fold(raw);
	if key.is_empty() {
		return None;
	}
	ACCOUNT_TYPE_ALIASES
		.iter()
		.find(|(alias, _, _)| *alias == key)
		.map(|(_, canonical, _)| *canonical)
}

/// What to do with a non-blank account type that matches no alias.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownAccountTypePolicy {
	/// Fall back to the configured default.
	#[default]
	Coerce,
	/// Refuse the merge.
	Reject,
}

impl FromStr for UnknownAccountTypePolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"coerce" => Ok(UnknownAccountTypePolicy::Coerce),
			"reject" => Ok(UnknownAccountTypePolicy::Reject),
			other => Err(format!("unknown account type policy: {other}")),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized account type: {0}")]
pub struct UnknownAccountType(pub String);

/// Outcome of resolving an untrusted account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTypeResolution {
	pub account_type: AccountType,
	/// True when `account_type` is the configured default rather than the caller's claim.
	pub defaulted: bool,
}

/// Resolve free-text input against the closed set.
///
/// Blank or missing input always takes `default`. Unrecognized input takes `default`
/// under [`UnknownAccountTypePolicy::Coerce`] and is an error under `Reject`.
pub fn resolve_account_type(
	raw: Option<&str>,
	default: AccountType,
	policy: UnknownAccountTypePolicy,
) -> Result<AccountTypeResolution, UnknownAccountType> {
	let raw = match raw.map(str::trim).filter(|s| !s.is_empty()) {
		Some(raw) => raw,
		None => {
			return Ok(AccountTypeResolution {
				account_type: default,
				defaulted: true,
			})
		}
	};

	match normalize_account_type(raw) {
		Some(account_type) => Ok(AccountTypeResolution {
			account_type,
			defaulted: false,
		}),
		None => match policy {
			UnknownAccountTypePolicy::Coerce => Ok(AccountTypeResolution {
				account_type: default,
				defaulted: true,
			}),
			UnknownAccountTypePolicy::Reject => Err(UnknownAccountType(raw.to_string())),
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn canonical_values_normalize_to_themselves() {
		for t in AccountType::all() {
			assert_eq!(normalize_account_type(t.as_str()), Some(*t));
			assert_eq!(t.as_str().parse::<AccountType>().unwrap(), *t);
		}
	}

	#[test]
	fn historical_values_reduce_to_current_set() {
		assert_eq!(normalize_account_type("Business"), Some(AccountType::Sme));
		assert_eq!(normalize_account_type("  Sole-Proprietor "), Some(AccountType::SoleProprietor));
		assert_eq!(normalize_account_type("self employed"), Some(AccountType::SoleProprietor));
		assert_eq!(normalize_account_type("PUBLIC_SECTOR"), Some(AccountType::Government));
		assert_eq!(normalize_account_type("angel--investor"), Some(AccountType::Investor));
	}

	#[test]
	fn unknown_and_blank_values_do_not_normalize() {
		assert_eq!(normalize_account_type("bogus"), None);
		assert_eq!(normalize_account_type("   "), None);
		assert_eq!(normalize_account_type(""), None);
	}

	#[test]
	fn aliases_are_unique_and_cover_every_canonical_type() {
		let mut seen = std::collections::HashSet::new();
		for (alias, _, _) in ACCOUNT_TYPE_ALIASES {
			assert!(seen.insert(*alias), "duplicate alias {alias}");
			assert_eq!(fold(alias), *alias, "alias {alias} is not pre-folded");
		}
		for t in AccountType::all() {
			assert!(seen.contains(t.as_str()));
		}
	}

	#[test]
	fn aliases_for_respects_revision() {
		let v1: Vec<_> = aliases_for(SchemaRevision::V1).map(|(a, _)| a).collect();
		assert!(v1.contains(&"business"));
		assert!(!v1.contains(&"government"));
		assert!(!v1.contains(&"sole_proprietor"));

		let current = aliases_for(SchemaRevision::CURRENT).count();
		assert_eq!(current, ACCOUNT_TYPE_ALIASES.len());
	}

	#[test]
	fn resolve_missing_takes_default() {
		let r = resolve_account_type(None, AccountType::Professional, UnknownAccountTypePolicy::Reject)
			.unwrap();
		assert_eq!(r.account_type, AccountType::Professional);
		assert!(r.defaulted);

		let r = resolve_account_type(Some("  "), AccountType::Sme, UnknownAccountTypePolicy::Reject)
			.unwrap();
		assert_eq!(r.account_type, AccountType::Sme);
		assert!(r.defaulted);
	}

	#[test]
	fn resolve_unknown_follows_policy() {
		let r = resolve_account_type(
			Some("bogus"),
			AccountType::Professional,
			UnknownAccountTypePolicy::Coerce,
		)
		.unwrap();
		assert_eq!(r.account_type, AccountType::Professional);
		assert!(r.defaulted);

		let err = resolve_account_type(
			Some("bogus"),
			AccountType::Professional,
			UnknownAccountTypePolicy::Reject,
		)
		.unwrap_err();
		assert_eq!(err, UnknownAccountType("bogus".to_string()));
	}

	#[test]
	fn resolve_known_is_not_defaulted() {
		let r = resolve_account_type(
			Some("charity"),
			AccountType::Professional,
			UnknownAccountTypePolicy::Reject,
		)
		.unwrap();
		assert_eq!(r.account_type, AccountType::Donor);
		assert!(!r.defaulted);
	}

	#[test]
	fn policy_parses() {
		assert_eq!(
			"Reject".parse::<UnknownAccountTypePolicy>().unwrap(),
			UnknownAccountTypePolicy::Reject
		);
		assert!("maybe".parse::<UnknownAccountTypePolicy>().is_err());
	}

	proptest! {
		#[test]
		fn normalization_is_deterministic_and_closed(raw in "\\PC{0,24}") {
			let first = normalize_account_type(&raw);
			prop_assert_eq!(first, normalize_account_type(&raw));
			if let Some(t) = first {
				prop_assert!(AccountType::all().contains(&t));
			}
		}

		#[test]
		fn coerce_never_fails(raw in "\\PC{0,24}") {
			let r = resolve_account_type(Some(&raw), AccountType::Sme, UnknownAccountTypePolicy::Coerce);
			prop_assert!(r.is_ok());
		}

		#[test]
		fn case_and_separator_insensitive(idx in 0usize..24, upper in any::<bool>()) {
			let (alias, canonical, _) = ACCOUNT_TYPE_ALIASES[idx % ACCOUNT_TYPE_ALIASES.len()];
			let spelled = alias.replace('_', " - ");
			let spelled = if upper { spelled.to_uppercase() } else { spelled };
			prop_assert_eq!(normalize_account_type(&spelled), Some(canonical));
		}
	}
}
