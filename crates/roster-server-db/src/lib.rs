// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for Roster server.
//!
//! SQLite repositories for identities, profiles, the lifecycle ledger, captured
//! errors, the provider's audit trail, and background job history. The traits
//! [`ProfileStore`], [`LifecycleEventStore`] and [`ErrorRecordStore`] are the seams the
//! provisioning services are written against.

pub mod audit_trail;
pub mod error;
pub mod error_record;
pub mod identity;
pub mod job;
pub mod lifecycle;
pub mod migrations;
pub mod pool;
pub mod profile;
pub mod testing;
mod time;

pub use audit_trail::{AuditTrailEntry, AuditTrailRepository};
pub use error::{DbError, Result};
pub use error_record::{ErrorRecord, ErrorRecordRepository, ErrorRecordStore, NewErrorRecord};
pub use identity::{IdentityCursor, IdentityRepository};
pub use job::{JobDefinition, JobRepository, JobRun, JobStatus, TriggerSource};
pub use lifecycle::{LifecycleEvent, LifecycleEventRepository, LifecycleEventStore, NewLifecycleEvent};
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use profile::{ProfileRepository, ProfileStore, ProfileUpsert};
