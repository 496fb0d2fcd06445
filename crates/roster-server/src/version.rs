// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build information for roster-server.

/// Git revision baked in at build time via `ROSTER_GIT_SHA`, if any.
pub const GIT_SHA: Option<&str> = option_env!("ROSTER_GIT_SHA");

/// Format version info for display.
pub fn format_version_info() -> String {
	format!(
		"roster-server version: {}\n\
		 Git SHA:               {}\n\
		 Platform:              {}-{}",
		env!("CARGO_PKG_VERSION"),
		GIT_SHA.unwrap_or("unknown"),
		std::env::consts::ARCH,
		std::env::consts::OS,
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn includes_package_version() {
		let info = format_version_info();
		assert!(info.starts_with(&format!("roster-server version: {}", env!("CARGO_PKG_VERSION"))));
		assert!(info.contains(std::env::consts::OS));
	}
}
