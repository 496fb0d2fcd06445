// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pool helpers for tests in this and downstream crates.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::migrations::run_migrations;
use crate::pool::create_pool;

/// Single-connection in-memory pool with the full schema applied.
///
/// One connection is required: every `:memory:` connection is its own database.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str("sqlite::memory:")
		.unwrap()
		.foreign_keys(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool");

	run_migrations(&pool).await.unwrap();
	pool
}

/// File-backed WAL pool for tests that need real concurrent connections.
pub async fn create_file_test_pool(dir: &Path) -> SqlitePool {
	let url = format!("sqlite:{}", dir.join("roster-test.db").display());
	let pool = create_pool(&url).await.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}

/// Disable foreign keys on a single-connection pool, to seed rows such as orphan
/// profiles that the schema would otherwise refuse.
pub async fn disable_foreign_keys(pool: &SqlitePool) {
	sqlx::query("PRAGMA foreign_keys = OFF")
		.execute(pool)
		.await
		.unwrap();
}
