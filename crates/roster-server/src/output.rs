// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Plain-text tables and JSON for operator commands.

use roster_server_analyzer::{BlockRateReport, BlockedEmail, ClassificationRow, HealthSummary};
use roster_provisioning_core::LifecycleEventType;
use roster_server_db::{ErrorRecord, JobDefinition, JobRun, LifecycleEvent};
use roster_server_jobs::JobsHealthStatus;
use roster_server_provisioning::{SweepOutcome, SweepRun};
use serde::Serialize;

/// Left-aligned columns sized to their widest cell.
#[derive(Debug, Clone, Default)]
pub struct Table {
	headers: Vec<String>,
	rows: Vec<Vec<String>>,
}

impl Table {
	pub fn new(headers: &[&str]) -> Self {
		Self {
			headers: headers.iter().map(|h| h.to_string()).collect(),
			rows: Vec::new(),
		}
	}

	pub fn add_row(&mut self, row: Vec<String>) {
		self.rows.push(row);
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	pub fn render(&self) -> String {
		let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
		for row in &self.rows {
			for (i, cell) in row.iter().enumerate() {
				if let Some(width) = widths.get_mut(i) {
					*width = (*width).max(cell.chars().count());
				}
			}
		}

		let line = |cells: &[String]| {
			cells
				.iter()
				.zip(&widths)
				.map(|(cell, width)| format!("{cell:<width$}"))
				.collect::<Vec<_>>()
				.join("  ")
				.trim_end()
				.to_string()
		};

		let mut out = line(&self.headers);
		out.push('\n');
		out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
		for row in &self.rows {
			out.push('\n');
			out.push_str(&line(row));
		}
		out
	}
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
	serde_json::to_string_pretty(value)
}

fn opt(value: Option<&str>) -> String {
	value.unwrap_or("-").to_string()
}

pub fn sweep_table(run: &SweepRun) -> Table {
	let mut table = Table::new(&["SUBJECT", "RESULT", "DETAIL"]);
	for report in &run.reports {
		let (result, detail) = match &report.outcome {
			SweepOutcome::Repaired { outcome } => ("repaired", outcome.to_string()),
			SweepOutcome::Failed { message, error_id } => (
				"failed",
				match error_id {
					Some(id) => format!("{message} (error {id})"),
					None => message.clone(),
				},
			),
		};
		table.add_row(vec![report.subject_id.to_string(), result.to_string(), detail]);
	}
	table
}

pub fn classification_table(rows: &[ClassificationRow]) -> Table {
	let mut table = Table::new(&["SUBJECT", "EMAIL", "STATUS", "EVENTS"]);
	for row in rows {
		table.add_row(vec![
			row.subject_id.to_string(),
			opt(row.email.as_deref()),
			row.status.to_string(),
			row.event_count.to_string(),
		]);
	}
	table
}

pub fn health_summary_line(summary: &HealthSummary) -> String {
	format!(
		"{} subjects: {} healthy, {} missing profile, {} missing lifecycle event, {} orphan profile",
		summary.total,
		summary.healthy,
		summary.missing_profile,
		summary.missing_lifecycle_event,
		summary.orphan_profile
	)
}

pub fn block_rate_lines(report: &BlockRateReport) -> String {
	format!(
		"Window:            {} .. {}\n\
		 Signup attempts:   {}\n\
		 Blocked attempts:  {}\n\
		 Block rate:        {:.1}%\n\
		 Blocked sources:   {}\n\
		 Anomaly level:     {}\n\
		 Distributed abuse: {}",
		report.window_start.to_rfc3339(),
		report.window_end.to_rfc3339(),
		report.total_attempts,
		report.blocked_attempts,
		report.block_rate * 100.0,
		report.distinct_blocked_sources,
		report.level,
		if report.distributed_abuse { "yes" } else { "no" },
	)
}

pub fn blocked_table(blocked: &[BlockedEmail]) -> Table {
	let mut table = Table::new(&[
		"EMAIL",
		"ATTEMPTS",
		"SOURCES",
		"FIRST SEEN",
		"LAST SEEN",
		"IDENTITY",
		"LEGIT?",
	]);
	for entry in blocked {
		table.add_row(vec![
			entry.email.clone(),
			entry.attempts.to_string(),
			entry.distinct_sources.to_string(),
			entry.first_seen.format("%Y-%m-%d %H:%M").to_string(),
			entry.last_seen.format("%Y-%m-%d %H:%M").to_string(),
			entry
				.matched_identity
				.map(|id| id.to_string())
				.unwrap_or_else(|| "-".to_string()),
			if entry.potentially_legitimate { "yes" } else { "no" }.to_string(),
		]);
	}
	table
}

pub fn errors_table(records: &[ErrorRecord]) -> Table {
	let mut table = Table::new(&["ID", "CREATED", "SUBJECT", "STAGE", "MESSAGE", "RESOLVED BY"]);
	for record in records {
		table.add_row(vec![
			record.id.to_string(),
			record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
			record
				.subject_id
				.map(|id| id.to_string())
				.unwrap_or_else(|| "-".to_string()),
			opt(record.context.get("stage").and_then(|s| s.as_str())),
			record.message.clone(),
			opt(record.resolved_by.as_deref()),
		]);
	}
	table
}

pub fn events_table(events: &[LifecycleEvent]) -> Table {
	let mut table = Table::new(&["CREATED", "EVENT", "EMAIL", "METADATA"]);
	for event in events {
		table.add_row(vec![
			event.created_at.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
			event.event_type.to_string(),
			opt(event.email_snapshot.as_deref()),
			event.metadata.to_string(),
		]);
	}
	table
}

pub fn event_counts_table(counts: &[(LifecycleEventType, i64)]) -> Table {
	let mut table = Table::new(&["EVENT", "COUNT"]);
	for (event_type, count) in counts {
		table.add_row(vec![event_type.to_string(), count.to_string()]);
	}
	table
}

pub fn job_definitions_table(definitions: &[JobDefinition]) -> Table {
	let mut table = Table::new(&["JOB", "NAME", "EVERY", "DESCRIPTION"]);
	for def in definitions {
		table.add_row(vec![
			def.id.clone(),
			def.name.clone(),
			def.interval_secs
				.map(|secs| format!("{secs}s"))
				.unwrap_or_else(|| "-".to_string()),
			def.description.clone(),
		]);
	}
	table
}

pub fn jobs_health_table(health: &JobsHealthStatus) -> Table {
	let mut table = Table::new(&["JOB", "HEALTH", "LAST RUN", "LAST STATUS", "FAILURES"]);
	for job in &health.jobs {
		let (started, status) = match &job.last_run {
			Some(run) => (
				run.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
				run.status.as_str().to_string(),
			),
			None => ("-".to_string(), "never run".to_string()),
		};
		table.add_row(vec![
			job.job_id.clone(),
			format!("{:?}", job.status).to_lowercase(),
			started,
			status,
			job.consecutive_failures.to_string(),
		]);
	}
	table
}

pub fn job_runs_table(runs: &[JobRun]) -> Table {
	let mut table = Table::new(&["RUN", "STARTED", "STATUS", "TRIGGER", "RETRIES", "ERROR"]);
	for run in runs {
		table.add_row(vec![
			run.id.clone(),
			run.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
			run.status.as_str().to_string(),
			run.triggered_by.as_str().to_string(),
			run.retry_count.to_string(),
			opt(run.error_message.as_deref()),
		]);
	}
	table
}
