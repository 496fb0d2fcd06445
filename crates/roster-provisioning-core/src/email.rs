// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Syntactic email checks. No DNS or deliverability checks happen here.

use regex::Regex;
use std::sync::LazyLock;

const MAX_LOCAL_LEN: usize = 64;
const MAX_EMAIL_LEN: usize = 254;

/// Dot-separated atoms in the local part, and at least two hostname labels.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$",
	)
	.expect("EMAIL_REGEX is a valid pattern")
});

/// Returns true if `email` looks like `local@label.tld`.
pub fn is_valid_email(email: &str) -> bool {
	if email.is_empty() || email.len() > MAX_EMAIL_LEN {
		return false;
	}
	match email.split_once('@') {
		Some((local, _)) if local.len() <= MAX_LOCAL_LEN => EMAIL_REGEX.is_match(email),
		_ => false,
	}
}

/// Lowercased domain part of an email, if any.
pub fn email_domain(email: &str) -> Option<String> {
	email
		.rsplit_once('@')
		.map(|(_, domain)| domain.trim().to_ascii_lowercase())
		.filter(|d| !d.is_empty())
}
