// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use roster_server_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
	#[error("database error: {0}")]
	Database(#[from] DbError),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
