// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for Roster server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`ROSTER_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use roster_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Sweeping every {}s", config.sweeper.interval_secs);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Longest anomaly window accepted, one year.
pub const MAX_WINDOW_HOURS: u32 = 24 * 366;

/// Longest look-back in days accepted for `legit_recent_days` and job history retention.
pub const MAX_RETENTION_DAYS: u32 = 3650;

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub provisioning: ProvisioningConfig,
	pub sweeper: SweeperConfig,
	pub analyzer: AnalyzerConfig,
	pub jobs: JobsConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`ROSTER_SERVER_*`)
/// 2. Config file (`/etc/roster/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let provisioning = layer
		.provisioning
		.unwrap_or_default()
		.finalize()
		.map_err(|message| ConfigError::InvalidValue {
			key: "provisioning".to_string(),
			message,
		})?;
	let sweeper = layer.sweeper.unwrap_or_default().finalize();
	let analyzer = layer.analyzer.unwrap_or_default().finalize();
	let jobs = layer.jobs.unwrap_or_default().finalize();

	let config = ServerConfig {
		database,
		logging,
		provisioning,
		sweeper,
		analyzer,
		jobs,
	};
	validate_config(&config)?;

	info!(
		database = %config.database.url,
		default_account_type = %config.provisioning.default_account_type,
		unknown_account_type_policy = ?config.provisioning.unknown_account_type_policy,
		sweeper_enabled = config.sweeper.enabled,
		sweeper_interval_secs = config.sweeper.interval_secs,
		analyzer_window_hours = config.analyzer.window_hours,
		"Server configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
pub fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	let analyzer = &config.analyzer;

	for (name, rate) in [
		("critical_block_rate", analyzer.critical_block_rate),
		("warning_block_rate", analyzer.warning_block_rate),
	] {
		if !(0.0..=1.0).contains(&rate) {
			return Err(ConfigError::Validation(format!(
				"analyzer.{name} must be within [0, 1], got {rate}"
			)));
		}
	}

	if analyzer.warning_block_rate > analyzer.critical_block_rate {
		return Err(ConfigError::Validation(format!(
			"analyzer.warning_block_rate ({}) exceeds analyzer.critical_block_rate ({})",
			analyzer.warning_block_rate, analyzer.critical_block_rate
		)));
	}

	if analyzer.legit_min_attempts > analyzer.legit_max_attempts {
		return Err(ConfigError::Validation(format!(
			"analyzer.legit_min_attempts ({}) exceeds analyzer.legit_max_attempts ({})",
			analyzer.legit_min_attempts, analyzer.legit_max_attempts
		)));
	}

	if analyzer.window_hours == 0 || analyzer.window_hours > MAX_WINDOW_HOURS {
		return Err(ConfigError::Validation(format!(
			"analyzer.window_hours must be within [1, {MAX_WINDOW_HOURS}], got {}",
			analyzer.window_hours
		)));
	}

	for (name, days) in [
		("analyzer.legit_recent_days", analyzer.legit_recent_days),
		("jobs.history_retention_days", config.jobs.history_retention_days),
	] {
		if days > MAX_RETENTION_DAYS {
			return Err(ConfigError::Validation(format!(
				"{name} must be at most {MAX_RETENTION_DAYS}, got {days}"
			)));
		}
	}

	if analyzer.blocked_marker.trim().is_empty() {
		return Err(ConfigError::Validation(
			"analyzer.blocked_marker must not be empty".to_string(),
		));
	}

	if config.sweeper.batch_size == 0 {
		return Err(ConfigError::Validation(
			"sweeper.batch_size must be greater than zero".to_string(),
		));
	}

	if config.sweeper.enabled && config.sweeper.interval_secs == 0 {
		return Err(ConfigError::Validation(
			"sweeper.interval_secs must be greater than zero when the sweeper is enabled"
				.to_string(),
		));
	}

	if config.jobs.history_cleanup_interval_secs == 0 {
		return Err(ConfigError::Validation(
			"jobs.history_cleanup_interval_secs must be greater than zero".to_string(),
		));
	}

	Ok(())
}
