// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::DbError;

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(s)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid timestamp '{s}': {e}")))
}

pub(crate) fn parse_opt_ts(s: Option<String>) -> Result<Option<DateTime<Utc>>, DbError> {
	s.as_deref().map(parse_ts).transpose()
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;

	#[test]
	fn formatted_timestamps_sort_chronologically() {
		let a = Utc::now();
		let b = a + Duration::milliseconds(1);
		let c = a + Duration::days(400);
		let mut formatted = vec![format_ts(c), format_ts(a), format_ts(b)];
		formatted.sort();
		assert_eq!(formatted, vec![format_ts(a), format_ts(b), format_ts(c)]);
	}

	#[test]
	fn roundtrips() {
		let now = Utc::now();
		assert_eq!(parse_ts(&format_ts(now)).unwrap(), now);
		assert!(parse_ts("yesterday").is_err());
	}
}
