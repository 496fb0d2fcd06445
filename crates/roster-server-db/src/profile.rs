// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Profile persistence.
//!
//! The only write is [`ProfileRepository::upsert_fill_blanks`], a single
//! `INSERT ... ON CONFLICT DO UPDATE ... WHERE` statement. Each column keeps its stored
//! value when non-empty and otherwise adopts the incoming value; the update is skipped
//! entirely when there is nothing to fill, so repeated calls never touch the row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roster_provisioning_core::{AccountType, IdentityId, MergeOutcome, Profile};
use sqlx::SqlitePool;

use crate::error::{DbError, Result};
use crate::time::{format_ts, parse_ts};

/// One merge request, already validated. Blank strings must be `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpsert {
	pub id: IdentityId,
	pub email: Option<String>,
	pub full_name: Option<String>,
	pub phone: Option<String>,
	pub account_type: AccountType,
	pub account_type_defaulted: bool,
	pub business_name: Option<String>,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
	/// Atomically insert the profile or fill its blank fields.
	async fn upsert_fill_blanks(&self, upsert: &ProfileUpsert) -> Result<MergeOutcome>;

	async fn get(&self, id: IdentityId) -> Result<Option<Profile>>;
}

type ProfileRow = (
	String,
	Option<String>,
	Option<String>,
	Option<String>,
	String,
	bool,
	Option<String>,
	String,
	String,
);

const PROFILE_COLUMNS: &str = "p.id, p.email, p.full_name, p.phone, p.account_type, \
	 p.account_type_defaulted, p.business_name, p.created_at, p.updated_at";

// Placeholder emails (`missing-email-<id>@invalid`) count as blank on the stored side
// and never replace a stored value on the incoming side. `revision` is 0 on insert and
// bumped by every update, so the returned value tells a create from an enrichment.
const UPSERT_SQL: &str = r#"
	INSERT INTO profiles (
		id, email, full_name, phone, account_type, account_type_defaulted,
		business_name, created_at, updated_at
	) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
	ON CONFLICT(id) DO UPDATE SET
		email = CASE
			WHEN COALESCE(profiles.email, '') = '' THEN excluded.email
			WHEN profiles.email LIKE 'missing-email-%@invalid'
				AND COALESCE(excluded.email, '') <> ''
				AND excluded.email NOT LIKE 'missing-email-%@invalid' THEN excluded.email
			ELSE profiles.email
		END,
		full_name = CASE
			WHEN COALESCE(profiles.full_name, '') = '' THEN excluded.full_name
			ELSE profiles.full_name
		END,
		phone = CASE
			WHEN COALESCE(profiles.phone, '') = '' THEN excluded.phone
			ELSE profiles.phone
		END,
		business_name = CASE
			WHEN COALESCE(profiles.business_name, '') = '' THEN excluded.business_name
			ELSE profiles.business_name
		END,
		account_type = CASE
			WHEN profiles.account_type_defaulted = 1 AND excluded.account_type_defaulted = 0
				THEN excluded.account_type
			ELSE profiles.account_type
		END,
		account_type_defaulted = CASE
			WHEN profiles.account_type_defaulted = 1 AND excluded.account_type_defaulted = 0 THEN 0
			ELSE profiles.account_type_defaulted
		END,
		revision = profiles.revision + 1,
		updated_at = excluded.updated_at
	WHERE (COALESCE(profiles.email, '') = '' AND COALESCE(excluded.email, '') <> '')
		OR (profiles.email LIKE 'missing-email-%@invalid'
			AND COALESCE(excluded.email, '') <> ''
			AND excluded.email NOT LIKE 'missing-email-%@invalid')
		OR (COALESCE(profiles.full_name, '') = '' AND COALESCE(excluded.full_name, '') <> '')
		OR (COALESCE(profiles.phone, '') = '' AND COALESCE(excluded.phone, '') <> '')
		OR (COALESCE(profiles.business_name, '') = '' AND COALESCE(excluded.business_name, '') <> '')
		OR (profiles.account_type_defaulted = 1 AND excluded.account_type_defaulted = 0)
	RETURNING revision
"#;

#[derive(Clone)]
pub struct ProfileRepository {
	pool: SqlitePool,
}

impl ProfileRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, upsert), fields(subject_id = %upsert.id))]
	pub async fn upsert_fill_blanks(&self, upsert: &ProfileUpsert) -> Result<MergeOutcome> {
		self.upsert_fill_blanks_at(upsert, Utc::now()).await
	}

	async fn upsert_fill_blanks_at(
		&self,
		upsert: &ProfileUpsert,
		at: DateTime<Utc>,
	) -> Result<MergeOutcome> {
		let now = format_ts(at);

		let returned: Option<(i64,)> = sqlx::query_as(UPSERT_SQL)
			.bind(upsert.id.to_string())
			.bind(&upsert.email)
			.bind(&upsert.full_name)
			.bind(&upsert.phone)
			.bind(upsert.account_type.as_str())
			.bind(upsert.account_type_defaulted)
			.bind(&upsert.business_name)
			.bind(&now)
			.bind(&now)
			.fetch_optional(&self.pool)
			.await?;

		let outcome = match returned {
			None => MergeOutcome::Unchanged,
			Some((0,)) => MergeOutcome::Created,
			Some(_) => MergeOutcome::Enriched,
		};

		tracing::debug!(outcome = %outcome, "profile upsert applied");
		Ok(outcome)
	}

	#[tracing::instrument(skip(self))]
	pub async fn get(&self, id: IdentityId) -> Result<Option<Profile>> {
		let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.id = ?");
		let row = sqlx::query_as::<_, ProfileRow>(&sql)
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.map(profile_from_row).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn count(&self) -> Result<i64> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM profiles")
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_ids(&self) -> Result<Vec<IdentityId>> {
		let rows: Vec<(String,)> = sqlx::query_as("SELECT id FROM profiles ORDER BY id")
			.fetch_all(&self.pool)
			.await?;

		rows
			.into_iter()
			.map(|(id,)| parse_id(&id))
			.collect()
	}

	/// Profiles whose identity no longer exists.
	#[tracing::instrument(skip(self))]
	pub async fn list_orphans(&self) -> Result<Vec<Profile>> {
		let sql = format!(
			"SELECT {PROFILE_COLUMNS} FROM profiles p \
			 LEFT JOIN identities i ON i.id = p.id \
			 WHERE i.id IS NULL ORDER BY p.created_at"
		);
		let rows = sqlx::query_as::<_, ProfileRow>(&sql)
			.fetch_all(&self.pool)
			.await?;

		rows.into_iter().map(profile_from_row).collect()
	}
}

#[async_trait]
impl ProfileStore for ProfileRepository {
	async fn upsert_fill_blanks(&self, upsert: &ProfileUpsert) -> Result<MergeOutcome> {
		self.upsert_fill_blanks(upsert).await
	}

	async fn get(&self, id: IdentityId) -> Result<Option<Profile>> {
		self.get(id).await
	}
}

fn parse_id(id: &str) -> Result<IdentityId> {
	id.parse()
		.map_err(|e| DbError::Internal(format!("invalid profile id '{id}': {e}")))
}

fn profile_from_row(
	(
		id,
		email,
		full_name,
		phone,
		account_type,
		account_type_defaulted,
		business_name,
		created_at,
		updated_at,
	): ProfileRow,
) -> Result<Profile> {
	Ok(Profile {
		id: parse_id(&id)?,
		email,
		full_name,
		phone,
		account_type: account_type
			.parse()
			.map_err(|e| DbError::Internal(format!("{e}")))?,
		account_type_defaulted,
		business_name,
		created_at: parse_ts(&created_at)?,
		updated_at: parse_ts(&updated_at)?,
	})
}
