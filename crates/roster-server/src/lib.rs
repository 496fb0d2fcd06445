// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Roster server: operator commands and background service for account provisioning.

pub mod app;
pub mod jobs;
pub mod logging;
pub mod output;
pub mod version;

pub use app::{App, IngestResult};
