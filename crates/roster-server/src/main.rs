// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Roster account provisioning server binary.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use roster_provisioning_core::{ErrorRecordId, IdentityId, IdentityRecord, LifecycleEventType};
use roster_server::jobs::build_scheduler;
use roster_server::{logging, output, version, App};
use roster_server_analyzer::{ClassificationStatus, HealthSummary};
use roster_server_config::ServerConfig;
use roster_server_jobs::TriggerSource;
use roster_server_provisioning::HookOutcome;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Roster server - account provisioning and reconciliation.
#[derive(Parser, Debug)]
#[command(
	name = "roster-server",
	about = "Roster account provisioning server",
	version
)]
struct Args {
	/// Config file to use instead of /etc/roster/server.toml
	#[arg(long, global = true, env = "ROSTER_SERVER_CONFIG")]
	config: Option<PathBuf>,

	/// Print JSON instead of tables
	#[arg(long, global = true)]
	json: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run migrations and the background scheduler until Ctrl-C
	Serve,
	/// Record identities from a JSON file (or `-` for stdin) and provision their profiles
	Ingest {
		/// Path to a JSON identity or array of identities
		input: String,
	},
	/// Run one reconciliation sweep
	Sweep,
	/// Correlate identities, profiles, and lifecycle events
	Classify {
		/// Only show subjects that are not healthy
		#[arg(long)]
		problems: bool,
	},
	/// Report the signup block rate over the configured window
	Anomalies,
	/// List blocked signup emails
	BlockedEmails,
	/// Inspect and resolve captured provisioning errors
	Errors {
		#[command(subcommand)]
		command: ErrorsCommand,
	},
	/// Show the lifecycle ledger for one subject, or totals per event type
	Events {
		#[arg(required_unless_present = "counts")]
		subject: Option<IdentityId>,
		/// Count events of each type across all subjects
		#[arg(long, conflicts_with = "subject")]
		counts: bool,
	},
	/// Inspect and run background jobs
	Jobs {
		#[command(subcommand)]
		command: JobsCommand,
	},
	/// Show version and build information
	Version,
}

#[derive(Subcommand, Debug)]
enum ErrorsCommand {
	/// List error records, newest first
	List {
		/// Include resolved records
		#[arg(long)]
		all: bool,
		#[arg(long, default_value_t = 50)]
		limit: u32,
	},
	/// Mark an error record resolved
	Resolve {
		id: ErrorRecordId,
		/// Who resolved it
		#[arg(long)]
		by: String,
		#[arg(long)]
		notes: Option<String>,
	},
}

#[derive(Subcommand, Debug)]
enum JobsCommand {
	/// Registered jobs and their intervals
	List,
	/// Health of every registered job, from recorded run history
	Status,
	/// Run a job now and wait for it to finish
	Run {
		job_id: String,
	},
	/// Recent runs of one job, newest first
	History {
		job_id: String,
		#[arg(long, default_value_t = 20)]
		limit: u32,
	},
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IngestInput {
	Many(Vec<IdentityRecord>),
	One(IdentityRecord),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => roster_server_config::load_config_with_file(path.clone()),
		None => roster_server_config::load_config(),
	}
	.context("failed to load configuration")?;

	logging::init_tracing(&config.logging);

	let app = App::connect(&config)
		.await
		.with_context(|| format!("failed to open database {}", config.database.url))?;

	match args.command {
		Command::Serve => serve(app, &config).await,
		Command::Ingest { input } => ingest(&app, &input, args.json).await,
		Command::Sweep => sweep(&app, args.json).await,
		Command::Classify { problems } => classify(&app, problems, args.json).await,
		Command::Anomalies => {
			let report = app.analyzer.block_rate_report(Utc::now()).await?;
			if args.json {
				println!("{}", output::to_json(&report)?);
			} else {
				println!("{}", output::block_rate_lines(&report));
			}
			Ok(())
		}
		Command::BlockedEmails => {
			let blocked = app.analyzer.blocked_emails(Utc::now()).await?;
			if args.json {
				println!("{}", output::to_json(&blocked)?);
			} else {
				println!("{}", output::blocked_table(&blocked).render());
			}
			Ok(())
		}
		Command::Errors { command } => errors(&app, command, args.json).await,
		Command::Events { subject, counts } => events(&app, subject, counts, args.json).await,
		Command::Jobs { command } => jobs(&app, &config, command, args.json).await,
		Command::Version => Ok(()),
	}
}

async fn serve(app: App, config: &ServerConfig) -> anyhow::Result<()> {
	tracing::info!(database = %config.database.url, "starting roster-server");

	let scheduler = build_scheduler(&app, config);
	scheduler
		.start()
		.await
		.context("failed to start job scheduler")?;

	tokio::signal::ctrl_c()
		.await
		.context("failed to listen for shutdown signal")?;
	tracing::info!("Received shutdown signal");
	scheduler.shutdown().await;

	tracing::info!("Server shutdown complete");
	Ok(())
}

async fn ingest(app: &App, input: &str, as_json: bool) -> anyhow::Result<()> {
	let raw = if input == "-" {
		tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin())).await??
	} else {
		tokio::fs::read_to_string(input)
			.await
			.with_context(|| format!("failed to read {input}"))?
	};
	let identities = match serde_json::from_str(&raw).context("invalid identity JSON")? {
		IngestInput::Many(identities) => identities,
		IngestInput::One(identity) => vec![identity],
	};

	let mut results = Vec::with_capacity(identities.len());
	for identity in &identities {
		results.push((identity.id, app.ingest(identity).await?));
	}

	if as_json {
		let rows: Vec<_> = results
			.iter()
			.map(|(id, result)| match result.outcome {
				HookOutcome::Provisioned(outcome) => json!({
					"subject_id": id,
					"recorded": result.recorded,
					"status": "provisioned",
					"outcome": outcome,
				}),
				HookOutcome::Deferred { error_id } => json!({
					"subject_id": id,
					"recorded": result.recorded,
					"status": "deferred",
					"error_id": error_id,
				}),
			})
			.collect();
		println!("{}", output::to_json(&rows)?);
	} else {
		let mut table = output::Table::new(&["SUBJECT", "RECORDED", "RESULT"]);
		for (id, result) in &results {
			let outcome = match result.outcome {
				HookOutcome::Provisioned(outcome) => format!("provisioned ({outcome})"),
				HookOutcome::Deferred { error_id: Some(e) } => format!("deferred (error {e})"),
				HookOutcome::Deferred { error_id: None } => "deferred".to_string(),
			};
			table.add_row(vec![
				id.to_string(),
				if result.recorded { "new" } else { "existing" }.to_string(),
				outcome,
			]);
		}
		println!("{}", table.render());
	}
	Ok(())
}

async fn sweep(app: &App, as_json: bool) -> anyhow::Result<()> {
	let cancelled = Arc::new(AtomicBool::new(false));
	let flag = Arc::clone(&cancelled);
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			flag.store(true, Ordering::SeqCst);
		}
	});

	let run = app
		.sweeper
		.run(|| cancelled.load(Ordering::SeqCst))
		.await?;
	let summary = run.summary();

	if as_json {
		println!("{}", output::to_json(&json!({ "summary": summary, "reports": run.reports }))?);
	} else {
		if !run.reports.is_empty() {
			println!("{}\n", output::sweep_table(&run).render());
		}
		println!(
			"{} visited, {} created, {} enriched, {} unchanged, {} failed{}",
			summary.visited,
			summary.created,
			summary.enriched,
			summary.unchanged,
			summary.failed,
			if summary.cancelled { " (cancelled)" } else { "" }
		);
	}
	Ok(())
}

async fn classify(app: &App, problems_only: bool, as_json: bool) -> anyhow::Result<()> {
	let mut rows = app.analyzer.classify().await?;
	let summary = HealthSummary::from_rows(&rows);
	if problems_only {
		rows.retain(|row| row.status != ClassificationStatus::Healthy);
	}

	if as_json {
		println!("{}", output::to_json(&json!({ "summary": summary, "rows": rows }))?);
	} else {
		if !rows.is_empty() {
			println!("{}\n", output::classification_table(&rows).render());
		}
		println!("{}", output::health_summary_line(&summary));
	}
	Ok(())
}

async fn errors(app: &App, command: ErrorsCommand, as_json: bool) -> anyhow::Result<()> {
	match command {
		ErrorsCommand::List { all, limit } => {
			let records = app.triage.list(!all, limit).await?;
			if as_json {
				println!("{}", output::to_json(&records)?);
			} else {
				println!("{}", output::errors_table(&records).render());
				if !all {
					println!("\n{} unresolved", app.triage.count_unresolved().await?);
				}
			}
		}
		ErrorsCommand::Resolve { id, by, notes } => {
			let record = app.triage.resolve(id, &by, notes.as_deref()).await?;
			if as_json {
				println!("{}", output::to_json(&record)?);
			} else {
				println!(
					"Error {} resolved by {}",
					record.id,
					record.resolved_by.as_deref().unwrap_or(&by)
				);
			}
		}
	}
	Ok(())
}

async fn events(
	app: &App,
	subject: Option<IdentityId>,
	counts: bool,
	as_json: bool,
) -> anyhow::Result<()> {
	if counts {
		let mut totals = Vec::with_capacity(LifecycleEventType::all().len());
		for event_type in LifecycleEventType::all() {
			totals.push((*event_type, app.events.count_by_type(*event_type).await?));
		}
		if as_json {
			let map: serde_json::Map<_, _> = totals
				.iter()
				.map(|(event_type, count)| (event_type.to_string(), json!(count)))
				.collect();
			println!("{}", output::to_json(&map)?);
		} else {
			println!("{}", output::event_counts_table(&totals).render());
		}
		return Ok(());
	}

	let Some(subject) = subject else {
		anyhow::bail!("a subject id or --counts is required");
	};
	let events = app.events.list_for_subject(subject).await?;
	if as_json {
		println!("{}", output::to_json(&events)?);
	} else {
		println!("{}", output::events_table(&events).render());
	}
	Ok(())
}

async fn jobs(
	app: &App,
	config: &ServerConfig,
	command: JobsCommand,
	as_json: bool,
) -> anyhow::Result<()> {
	let scheduler = build_scheduler(app, config);
	scheduler
		.persist_definitions()
		.await
		.context("failed to store job definitions")?;

	match command {
		JobsCommand::List => {
			let definitions = app.jobs.list_definitions().await?;
			if as_json {
				println!("{}", output::to_json(&definitions)?);
			} else {
				println!("{}", output::job_definitions_table(&definitions).render());
			}
		}
		JobsCommand::Status => {
			let health = scheduler.health_status().await;
			if as_json {
				println!("{}", output::to_json(&health)?);
			} else {
				println!("{}", output::jobs_health_table(&health).render());
			}
		}
		JobsCommand::Run { job_id } => {
			let result = scheduler.trigger_job(&job_id, TriggerSource::Manual).await;
			let status = scheduler.job_status(&job_id).await;
			if as_json {
				println!("{}", output::to_json(&status)?);
			} else if let Some(run) = status.and_then(|s| s.last_run) {
				println!("Job {job_id} run {} {}", run.run_id, run.status.as_str());
			}
			result.with_context(|| format!("job {job_id} did not succeed"))?;
		}
		JobsCommand::History { job_id, limit } => {
			let runs = app.jobs.list_runs(&job_id, limit).await?;
			if as_json {
				println!("{}", output::to_json(&runs)?);
			} else {
				println!("{}", output::job_runs_table(&runs).render());
			}
		}
	}
	Ok(())
}
