// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{
	AnalyzerConfigLayer, DatabaseConfigLayer, JobsConfigLayer, LoggingConfigLayer,
	ProvisioningConfigLayer, SweeperConfigLayer,
};

/// One source's partial view of the configuration. Later layers override earlier ones
/// field by field.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub provisioning: Option<ProvisioningConfigLayer>,
	#[serde(default)]
	pub sweeper: Option<SweeperConfigLayer>,
	#[serde(default)]
	pub analyzer: Option<AnalyzerConfigLayer>,
	#[serde(default)]
	pub jobs: Option<JobsConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(existing), Some(incoming)) => merge(existing, incoming),
		(None, Some(incoming)) => *base = Some(incoming),
		(_, None) => {}
	}
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(
			&mut self.provisioning,
			other.provisioning,
			ProvisioningConfigLayer::merge,
		);
		merge_section(&mut self.sweeper, other.sweeper, SweeperConfigLayer::merge);
		merge_section(&mut self.analyzer, other.analyzer, AnalyzerConfigLayer::merge);
		merge_section(&mut self.jobs, other.jobs, JobsConfigLayer::merge);
	}
}
