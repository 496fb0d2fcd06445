// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Profile provisioning for Roster server.
//!
//! Every identity created by the authentication provider should end up with exactly one
//! profile. Two independent paths converge on that state through the same idempotent
//! merge:
//!
//! - [`ProvisioningHook`] runs inline when an identity is created. It never fails its
//!   caller; a failed merge is captured as an error record and deferred.
//! - [`ReconciliationSweeper`] periodically repairs identities the hook missed.
//!
//! Both write to the append-only lifecycle ledger through [`EventLedger`], which is
//! best effort, and capture failures through [`ErrorCapture`].

pub mod error;
pub mod errors;
pub mod hook;
pub mod ledger;
pub mod merge;
pub mod sweeper;

pub use error::{ProvisioningError, Result};
pub use errors::{ErrorCapture, ErrorTriage};
pub use hook::{HookOutcome, ProvisioningHook};
pub use ledger::EventLedger;
pub use merge::ProfileMerger;
pub use sweeper::{ReconciliationSweeper, SweepOutcome, SweepReport, SweepRun, SweepSummary};
