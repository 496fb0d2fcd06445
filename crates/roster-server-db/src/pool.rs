// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

use crate::error::DbError;

/// Create a SqlitePool with WAL mode, foreign keys and a busy timeout.
///
/// Concurrent upserts for the same profile serialize on SQLite's write lock, so the
/// busy timeout is what turns contention into waiting instead of an error.
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid, or `DbError::Sqlx` if connecting fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.foreign_keys(true)
		.busy_timeout(Duration::from_secs(5))
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn creates_wal_database_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("roster.db");
		let pool = create_pool(&format!("sqlite:{}", path.display()))
			.await
			.unwrap();

		let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
			.fetch_one(&pool)
			.await
			.unwrap();
		assert_eq!(mode.to_lowercase(), "wal");
		assert!(path.exists());
	}
}
