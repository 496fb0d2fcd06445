// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use roster_provisioning_core::UnknownAccountType;
use roster_server_db::DbError;

/// Errors that can occur while provisioning a profile.
///
/// None of these escape the hook or the sweeper; both convert them into error records.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
	#[error("database error: {0}")]
	Database(#[from] DbError),

	#[error("invalid account type: {0}")]
	InvalidAccountType(#[from] UnknownAccountType),

	#[error("not found: {0}")]
	NotFound(String),
}

impl ProvisioningError {
	/// Short machine-readable label stored in error-record context.
	pub fn kind(&self) -> &'static str {
		match self {
			ProvisioningError::Database(e) if e.is_transient() => "database_transient",
			ProvisioningError::Database(_) => "database",
			ProvisioningError::InvalidAccountType(_) => "invalid_account_type",
			ProvisioningError::NotFound(_) => "not_found",
		}
	}
}

pub type Result<T> = std::result::Result<T, ProvisioningError>;
