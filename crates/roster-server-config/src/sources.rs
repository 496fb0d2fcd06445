// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AnalyzerConfigLayer, DatabaseConfigLayer, JobsConfigLayer, LogFormat, LoggingConfigLayer,
	ProvisioningConfigLayer, SweeperConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/roster/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: ROSTER_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		layer_from_vars(&Vars(|name: &str| std::env::var(name).ok()))
	}
}

/// Variable lookup that treats empty values as unset.
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
	fn string(&self, name: &str) -> Option<String> {
		(self.0)(name).filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self
			.string(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parsed<T: FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
		match self.string(name) {
			Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {} value '{v}'", std::any::type_name::<T>()),
			}),
			None => Ok(None),
		}
	}

	fn list(&self, name: &str) -> Option<Vec<String>> {
		self.string(name).map(|s| {
			s.split(',')
				.map(|s| s.trim().to_string())
				.filter(|s| !s.is_empty())
				.collect()
		})
	}
}

fn layer_from_vars<F: Fn(&str) -> Option<String>>(
	vars: &Vars<F>,
) -> Result<ServerConfigLayer, ConfigError> {
	let format = match vars.string("ROSTER_SERVER_LOG_FORMAT") {
		Some(v) => Some(LogFormat::from_str(&v).map_err(|message| ConfigError::InvalidValue {
			key: "ROSTER_SERVER_LOG_FORMAT".to_string(),
			message,
		})?),
		None => None,
	};

	Ok(ServerConfigLayer {
		database: Some(DatabaseConfigLayer {
			url: vars.string("ROSTER_SERVER_DATABASE_URL"),
		}),
		logging: Some(LoggingConfigLayer {
			level: vars.string("ROSTER_SERVER_LOG_LEVEL"),
			format,
		}),
		provisioning: Some(ProvisioningConfigLayer {
			default_account_type: vars.string("ROSTER_SERVER_PROVISIONING_DEFAULT_ACCOUNT_TYPE"),
			unknown_account_type_policy: vars
				.string("ROSTER_SERVER_PROVISIONING_UNKNOWN_ACCOUNT_TYPE_POLICY"),
		}),
		sweeper: Some(SweeperConfigLayer {
			enabled: vars.bool("ROSTER_SERVER_SWEEPER_ENABLED"),
			interval_secs: vars.parsed("ROSTER_SERVER_SWEEPER_INTERVAL_SECS")?,
			batch_size: vars.parsed("ROSTER_SERVER_SWEEPER_BATCH_SIZE")?,
			max_subjects_per_run: vars.parsed("ROSTER_SERVER_SWEEPER_MAX_SUBJECTS_PER_RUN")?,
		}),
		analyzer: Some(AnalyzerConfigLayer {
			window_hours: vars.parsed("ROSTER_SERVER_ANALYZER_WINDOW_HOURS")?,
			critical_block_rate: vars.parsed("ROSTER_SERVER_ANALYZER_CRITICAL_BLOCK_RATE")?,
			warning_block_rate: vars.parsed("ROSTER_SERVER_ANALYZER_WARNING_BLOCK_RATE")?,
			distributed_min_blocked: vars.parsed("ROSTER_SERVER_ANALYZER_DISTRIBUTED_MIN_BLOCKED")?,
			distributed_min_sources: vars.parsed("ROSTER_SERVER_ANALYZER_DISTRIBUTED_MIN_SOURCES")?,
			legit_min_attempts: vars.parsed("ROSTER_SERVER_ANALYZER_LEGIT_MIN_ATTEMPTS")?,
			legit_max_attempts: vars.parsed("ROSTER_SERVER_ANALYZER_LEGIT_MAX_ATTEMPTS")?,
			legit_max_sources: vars.parsed("ROSTER_SERVER_ANALYZER_LEGIT_MAX_SOURCES")?,
			legit_recent_days: vars.parsed("ROSTER_SERVER_ANALYZER_LEGIT_RECENT_DAYS")?,
			blocked_marker: vars.string("ROSTER_SERVER_ANALYZER_BLOCKED_MARKER"),
			signup_action: vars.string("ROSTER_SERVER_ANALYZER_SIGNUP_ACTION"),
			disposable_domains: vars.list("ROSTER_SERVER_ANALYZER_DISPOSABLE_DOMAINS"),
		}),
		jobs: Some(JobsConfigLayer {
			history_retention_days: vars.parsed("ROSTER_SERVER_JOB_HISTORY_RETENTION_DAYS")?,
			history_cleanup_interval_secs: vars
				.parsed("ROSTER_SERVER_JOB_HISTORY_CLEANUP_INTERVAL_SECS")?,
		}),
	})
}
