// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema for the provisioning tables.
//!
//! Every statement is idempotent so `run_migrations` can run on each start.

use sqlx::SqlitePool;

use crate::error::Result;

const STATEMENTS: &[&str] = &[
	// Written by the identity provider; read-only to provisioning logic.
	r#"
	CREATE TABLE IF NOT EXISTS identities (
		id TEXT PRIMARY KEY NOT NULL,
		email TEXT,
		phone TEXT,
		metadata TEXT NOT NULL DEFAULT '{}',
		created_at TEXT NOT NULL
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_identities_created_at ON identities(created_at, id)",
	r#"
	CREATE TABLE IF NOT EXISTS profiles (
		id TEXT PRIMARY KEY NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
		email TEXT,
		full_name TEXT,
		phone TEXT,
		account_type TEXT NOT NULL CHECK (account_type IN (
			'sme', 'professional', 'investor', 'donor', 'government', 'sole_proprietor'
		)),
		account_type_defaulted INTEGER NOT NULL DEFAULT 0,
		business_name TEXT,
		revision INTEGER NOT NULL DEFAULT 0,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS lifecycle_events (
		id TEXT PRIMARY KEY NOT NULL,
		subject_id TEXT NOT NULL,
		event_type TEXT NOT NULL,
		email_snapshot TEXT,
		metadata TEXT NOT NULL DEFAULT '{}',
		created_at TEXT NOT NULL
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_lifecycle_events_subject ON lifecycle_events(subject_id, created_at)",
	"CREATE INDEX IF NOT EXISTS idx_lifecycle_events_type ON lifecycle_events(event_type)",
	r#"
	CREATE TRIGGER IF NOT EXISTS lifecycle_events_no_update
	BEFORE UPDATE ON lifecycle_events
	BEGIN
		SELECT RAISE(ABORT, 'lifecycle_events is append-only');
	END
	"#,
	r#"
	CREATE TRIGGER IF NOT EXISTS lifecycle_events_no_delete
	BEFORE DELETE ON lifecycle_events
	BEGIN
		SELECT RAISE(ABORT, 'lifecycle_events is append-only');
	END
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS provisioning_errors (
		id TEXT PRIMARY KEY NOT NULL,
		subject_id TEXT,
		message TEXT NOT NULL,
		detail TEXT NOT NULL DEFAULT '',
		context TEXT NOT NULL DEFAULT '{}',
		created_at TEXT NOT NULL,
		resolved INTEGER NOT NULL DEFAULT 0,
		resolved_by TEXT,
		resolved_at TEXT,
		notes TEXT
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_provisioning_errors_unresolved ON provisioning_errors(resolved, created_at)",
	"CREATE INDEX IF NOT EXISTS idx_provisioning_errors_subject ON provisioning_errors(subject_id)",
	// The identity provider's audit trail; read-only to the analyzer.
	r#"
	CREATE TABLE IF NOT EXISTS auth_audit_log (
		id TEXT PRIMARY KEY NOT NULL,
		action TEXT NOT NULL,
		actor TEXT NOT NULL,
		actor_id TEXT,
		source TEXT,
		created_at TEXT NOT NULL
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_auth_audit_log_created_at ON auth_audit_log(created_at)",
	r#"
	CREATE TABLE IF NOT EXISTS job_definitions (
		id TEXT PRIMARY KEY NOT NULL,
		name TEXT NOT NULL,
		description TEXT NOT NULL,
		job_type TEXT NOT NULL,
		interval_secs INTEGER,
		enabled INTEGER NOT NULL DEFAULT 1,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS job_runs (
		id TEXT PRIMARY KEY NOT NULL,
		job_id TEXT NOT NULL REFERENCES job_definitions(id),
		status TEXT NOT NULL,
		started_at TEXT NOT NULL,
		completed_at TEXT,
		duration_ms INTEGER,
		error_message TEXT,
		retry_count INTEGER NOT NULL DEFAULT 0,
		triggered_by TEXT NOT NULL,
		metadata TEXT
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_job_runs_job_started ON job_runs(job_id, started_at)",
];

#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	let mut tx = pool.begin().await?;
	for statement in STATEMENTS {
		sqlx::query(statement).execute(&mut *tx).await?;
	}
	tx.commit().await?;

	tracing::debug!(statements = STATEMENTS.len(), "database migrations applied");
	Ok(())
}
