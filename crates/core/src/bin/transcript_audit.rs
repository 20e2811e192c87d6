//! Parse one transcript, price it and print the result as JSON.
//!
//! Usage: transcript-audit [--config PATH] [--model ID] [--json-logs] <TRANSCRIPT>

use std::path::PathBuf;

use agent_tally_core::{apply_pricing, parse_transcript, DerivedMetrics, EngineConfig, ParsedTranscript};
use agent_tally_observability::{init_logging, LogConfig, LogFormat};
use anyhow::Context;
use clap::Parser;
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "transcript-audit", version, about = "Extract usage metrics from an agent session transcript")]
struct Args {
    /// Transcript file (newline-delimited JSON).
    transcript: PathBuf,

    /// Config file. Defaults to $AGENT_TALLY_CONFIG, then the user config dir.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Price the session as this model instead of the detected one.
    #[arg(long)]
    model: Option<String>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    json_logs: bool,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditReport<'a> {
    transcript: &'a ParsedTranscript,
    derived: DerivedMetrics,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _guard = init_logging(&LogConfig {
        format: if args.json_logs { LogFormat::Json } else { LogFormat::Text },
        ..Default::default()
    })?;

    let config = EngineConfig::load_with_precedence(args.config.as_deref())
        .context("failed to load configuration")?;
    let catalog = config.catalog();

    let mut parsed = parse_transcript(&args.transcript, &config.parse_options())
        .with_context(|| format!("failed to parse {}", args.transcript.display()))?;

    if let Some(model) = args.model {
        override_model(&mut parsed, model);
    }
    if !apply_pricing(&mut parsed, &catalog) {
        tracing::warn!(model = ?parsed.model, "No pricing available; cost left empty");
    }

    let report = AuditReport {
        derived: DerivedMetrics::from_transcript(&parsed),
        transcript: &parsed,
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    Ok(())
}

/// Replace the detected model everywhere it is reported.
fn override_model(parsed: &mut ParsedTranscript, model: String) {
    parsed.metrics.model = Some(model.clone());
    parsed.model = Some(model);
}
