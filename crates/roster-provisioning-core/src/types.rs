// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identifier newtypes.
//!
//! All ID types are transparent UUID wrappers so that a subject id can never be
//! passed where an error-record id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			pub fn into_inner(self) -> Uuid {
				self.0
			}

			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s.trim()).map(Self)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(
	IdentityId,
	"Identifier of an identity owned by the authentication provider. Profiles share it."
);
define_id_type!(EventId, "Identifier of a lifecycle ledger entry.");
define_id_type!(ErrorRecordId, "Identifier of a captured provisioning failure.");

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_with_surrounding_whitespace() {
		let id = IdentityId::generate();
		let parsed: IdentityId = format!("  {id} ").parse().unwrap();
		assert_eq!(parsed, id);
	}

	#[test]
	fn rejects_garbage() {
		assert!("not-a-uuid".parse::<IdentityId>().is_err());
	}

	#[test]
	fn serializes_transparently() {
		let uuid = Uuid::new_v4();
		let json = serde_json::to_string(&IdentityId::new(uuid)).unwrap();
		assert_eq!(json, format!("\"{uuid}\""));
	}
}
