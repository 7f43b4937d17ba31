//! `firmaudit run` -- execute the audit pipeline for one company.
//!
//! Loads configuration and API keys, runs the four stages, prints a run
//! summary table with per-stage highlights, and exits with the outcome
//! code (0 completed, 1 stage failed, 2 aborted). Ctrl+C cancels the
//! run; the partial report is still saved.
//!
//! # Example
//!
//! ```text
//! firmaudit run --company "Acme Corp"
//! firmaudit run --company "Acme Corp" --output-dir reports --verbose
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use firmaudit_core::{EnvCredentials, Orchestrator, PipelineRun, ProviderRegistry};
use firmaudit_types::{PipelineOutcome, PipelineReport, StagePayload, StageStatus};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::load_config;

/// Arguments for the `firmaudit run` subcommand.
#[derive(Args)]
pub struct RunArgs {
    /// Company to audit.
    #[arg(long)]
    pub company: String,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for the saved report (overrides config).
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Do not write the report to disk.
    #[arg(long)]
    pub no_save: bool,
}

/// Run the pipeline and print the results.
pub async fn run(args: RunArgs) -> anyhow::Result<PipelineOutcome> {
    let company = args.company.trim();
    if company.is_empty() {
        anyhow::bail!("company name must not be empty");
    }

    let loaded = load_config(args.config.as_deref()).await?;
    let mut config = loaded.config;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    match &loaded.source {
        Some(path) => info!(path = %path.display(), "using config file"),
        None => info!("using built-in configuration"),
    }

    let registry = ProviderRegistry::from_specs(config.providers.clone())?;
    let credentials = Arc::new(EnvCredentials::from_process(&registry));
    let mut orchestrator = Orchestrator::from_config(&config, credentials)?;
    if args.no_save {
        orchestrator = orchestrator.without_sink();
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received interrupt, stopping the run");
            trigger.cancel();
        }
    });

    println!("Auditing {company}");
    println!();

    let run = orchestrator.run(company, &cancel).await;
    print_run(&run, args.no_save);
    Ok(run.outcome)
}

fn print_run(run: &PipelineRun, no_save: bool) {
    println!("{}", summary_table(&run.report));

    if let Some(summary) = run.report.summary() {
        println!(
            "Providers available: {} ({})",
            summary.provider_count,
            summary.providers_available.join(", ")
        );
    }

    let lines = highlights(&run.report);
    if !lines.is_empty() {
        println!();
        println!("Highlights:");
        for line in lines {
            println!("  {line}");
        }
    }

    println!();
    println!("Outcome: {}", run.outcome);
    if let Some(ms) = run.report.elapsed_ms() {
        println!("Elapsed: {:.1}s", ms as f64 / 1000.0);
    }

    match (&run.persisted, &run.persist_error) {
        (Some(path), _) => println!("Report saved to {}", path.display()),
        (None, Some(err)) => eprintln!("warning: report was not saved: {err}"),
        (None, None) if no_save => println!("Report not saved (--no-save)"),
        (None, None) => {}
    }
}

/// One row per stage: configured spec, binding used, status.
fn summary_table(report: &PipelineReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["STAGE", "CONFIGURED", "MODEL USED", "STATUS", "ATTEMPTS", "TIME"]);

    let Some(summary) = report.summary() else {
        return table;
    };
    for entry in &summary.stages {
        let result = report.get(entry.stage);
        let binding = entry
            .binding
            .as_ref()
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".into());
        let status = match (entry.status, result.and_then(|r| r.error())) {
            (Some(StageStatus::Success), _) => "ok".to_string(),
            (Some(StageStatus::Failed), Some(err)) => format!("failed ({})", err.kind),
            (Some(StageStatus::Failed), None) => "failed".to_string(),
            (None, _) => "not run".to_string(),
        };
        let attempts = result.map(|r| r.attempts().to_string()).unwrap_or_else(|| "-".into());
        let time = result
            .map(|r| format!("{:.1}s", r.elapsed_ms() as f64 / 1000.0))
            .unwrap_or_else(|| "-".into());

        table.add_row([
            format!("{}. {}", entry.stage.number(), entry.stage.label()),
            entry.configured.clone(),
            binding,
            status,
            attempts,
            time,
        ]);
    }
    table
}

/// Short human-readable facts about each successful stage, and the
/// error of the failed one.
fn highlights(report: &PipelineReport) -> Vec<String> {
    let mut lines = Vec::new();
    for result in report.stages() {
        let label = result.stage().label();
        if let Some(err) = result.error() {
            lines.push(format!("{label}: {}", err.message));
            continue;
        }
        match result.payload() {
            Some(StagePayload::Profile(profile)) => {
                lines.push(format!("{label}: profile of {} characters", profile.char_count()));
            }
            Some(StagePayload::Questions(questions)) => {
                lines.push(format!(
                    "{label}: {} questions across {} stakeholder groups ({})",
                    questions.total(),
                    questions.categories.len(),
                    questions.stakeholders().join(", ")
                ));
            }
            Some(StagePayload::Answers(answers)) => {
                let c = answers.confidence_breakdown();
                let sentiment = answers
                    .sentiment_distribution()
                    .iter()
                    .map(|(k, v)| format!("{k} {v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                lines.push(format!(
                    "{label}: {} answers; confidence high {} / medium {} / low {}; sentiment {sentiment}",
                    answers.responses.len(),
                    c.high,
                    c.medium,
                    c.low
                ));
            }
            Some(StagePayload::Scores(card)) => {
                let s = &card.overall_summary;
                lines.push(format!(
                    "{label}: logic {:.1}, completeness {:.1}, clarity {:.1}; risk signal {}; {} of {} answers flagged",
                    s.average_logical_score,
                    s.average_completeness_score,
                    s.average_clarity_score,
                    or_dash(&s.overall_company_risk_signal),
                    card.flagged_items().len(),
                    card.evaluation_results.len()
                ));
            }
            None => {}
        }
    }
    lines
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() { "-" } else { s }
}
