mod backends;
mod display;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use covenant_core::{AnalyzerSettings, CaseEnvelope, ExtractorSettings, TenantSource};
use covenant_host::Stages;
use covenant_store::FsStore;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "covenant")]
#[command(about = "Contract review pipeline: text extraction, compliance and risk analysis, routing decision")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Config {
    /// Directory holding stored documents as <container>/<key>
    #[arg(long, env = "COVENANT_STORAGE_ROOT", default_value = ".", global = true)]
    storage_root: PathBuf,

    /// JSON file mapping tenant id to profile (re-read on every stage)
    #[arg(long, env = "COVENANT_TENANT_CONFIG", global = true)]
    tenant_config: Option<PathBuf>,

    /// Base URL of the text detection service
    #[arg(long, env = "COVENANT_OCR_URL", global = true)]
    ocr_url: Option<String>,

    /// URL of the generation endpoint
    #[arg(long, env = "COVENANT_INFERENCE_URL", global = true)]
    inference_url: Option<String>,

    /// Model identifier sent with every generation request
    #[arg(long, env = "COVENANT_MODEL_ID", global = true)]
    model_id: Option<String>,

    /// Delay between status checks of a PDF detection job
    #[arg(long, default_value_t = 2000, global = true)]
    poll_interval_ms: u64,

    /// Deadline for a PDF detection job
    #[arg(long, default_value_t = 300, global = true)]
    max_wait_secs: u64,

    /// Per-request timeout for the OCR and inference services
    #[arg(long, default_value_t = 60, global = true)]
    request_timeout_secs: u64,
}

#[derive(Args, Debug)]
struct Input {
    /// Envelope JSON file (stdin when omitted)
    #[arg(long, short)]
    input: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract text and open the case
    Ingest(Input),
    /// Compliance analysis on an ingested envelope
    Compliance(Input),
    /// Risk analysis on an ingested envelope
    Risk(Input),
    /// Route a case from its findings
    Decide(Input),
    /// Run every stage on an entry envelope
    Run(Input),
    /// Turn a storage notification into entry envelopes
    Event {
        #[command(flatten)]
        input: Input,
        /// Also run the pipeline on each entry
        #[arg(long)]
        run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    tracing::debug!("covenant v{}", env!("CARGO_PKG_VERSION"));
    let stages = build_stages(&cli.config)?;

    match cli.command {
        Command::Ingest(input) => {
            let envelope = read_envelope(input.input.as_deref())?;
            let out = stages.ingest(envelope).await?;
            print_json(&out)?;
        }
        Command::Compliance(input) => {
            let envelope = read_envelope(input.input.as_deref())?;
            print_json(&stages.compliance(envelope).await)?;
        }
        Command::Risk(input) => {
            let envelope = read_envelope(input.input.as_deref())?;
            print_json(&stages.risk(envelope).await)?;
        }
        Command::Decide(input) => {
            let envelope = read_envelope(input.input.as_deref())?;
            let out = stages.decide(envelope);
            display::print_case_card(&out);
            print_json(&out)?;
        }
        Command::Run(input) => {
            let envelope = read_envelope(input.input.as_deref())?;
            let report = stages.run(envelope).await?;
            eprintln!("run {}", report.run_name);
            display::print_case_card(&report.envelope);
            print_json(&report.envelope)?;
        }
        Command::Event { input, run } => {
            let text = read_input(input.input.as_deref())?;
            let event: serde_json::Value =
                serde_json::from_str(&text).context("parsing storage event")?;
            let entries = CaseEnvelope::from_storage_event(&event)?;
            tracing::info!(entries = entries.len(), "storage event read");

            if !run {
                print_json(&entries)?;
                return Ok(());
            }

            let outcomes = run_entries(&stages, entries).await;
            for outcome in &outcomes {
                if let EntryOutcome::Done(envelope) = outcome {
                    display::print_case_card(envelope);
                }
            }
            print_json(&outcomes)?;
        }
    }

    Ok(())
}

/// Result of running the pipeline on one storage-event entry.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EntryOutcome {
    Done(CaseEnvelope),
    Failed {
        document_uri: String,
        case_id: Option<String>,
        error: String,
    },
}

/// Run every entry; a failing entry is reported and the rest still run.
async fn run_entries(stages: &Stages, entries: Vec<CaseEnvelope>) -> Vec<EntryOutcome> {
    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in entries {
        let document_uri = entry.document_uri();
        let case_id = entry.case_id().map(str::to_string);
        match stages.run(entry).await {
            Ok(report) => outcomes.push(EntryOutcome::Done(report.envelope)),
            Err(e) => {
                tracing::warn!(uri = %document_uri, error = %e, "pipeline failed for entry");
                outcomes.push(EntryOutcome::Failed {
                    document_uri,
                    case_id,
                    error: e.to_string(),
                });
            }
        }
    }
    outcomes
}

fn build_stages(config: &Config) -> anyhow::Result<Stages> {
    let tenants = match &config.tenant_config {
        Some(path) => TenantSource::File(path.clone()),
        None => TenantSource::default(),
    };
    let extractor = ExtractorSettings {
        poll_interval: Duration::from_millis(config.poll_interval_ms),
        max_wait: Duration::from_secs(config.max_wait_secs),
    };

    let request_timeout = Duration::from_secs(config.request_timeout_secs);

    Ok(Stages::with_settings(
        Arc::new(FsStore::new(config.storage_root.clone())),
        backends::ocr(config.ocr_url.as_deref(), request_timeout)
            .context("building OCR client")?,
        backends::inference(
            config.inference_url.as_deref(),
            config.model_id.as_deref(),
            request_timeout,
        )
        .context("building inference client")?,
        tenants,
        extractor,
        AnalyzerSettings::default(),
    ))
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
            Ok(text)
        }
    }
}

fn read_envelope(path: Option<&Path>) -> anyhow::Result<CaseEnvelope> {
    let text = read_input(path)?;
    CaseEnvelope::from_json(&text).context("parsing envelope")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "covenant",
            "run",
            "--input",
            "case.json",
            "--poll-interval-ms",
            "50",
            "--model-id",
            "nova-lite",
        ])
        .unwrap();
        assert_eq!(cli.config.poll_interval_ms, 50);
        assert_eq!(cli.config.model_id.as_deref(), Some("nova-lite"));
        match cli.command {
            Command::Run(input) => assert_eq!(input.input, Some(PathBuf::from("case.json"))),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn event_run_flag() {
        let cli = Cli::try_parse_from(["covenant", "event", "--run"]).unwrap();
        assert!(matches!(cli.command, Command::Event { run: true, .. }));
        assert_eq!(cli.config.request_timeout_secs, 60);
    }

    #[tokio::test]
    async fn failed_entry_does_not_stop_the_batch() {
        use covenant_ai::testing::MockInference;
        use covenant_extract::testing::MockOcr;
        use covenant_store::MemoryStore;

        let store = MemoryStore::new().with_object("docs", "acme/terms.txt", "Governing law: New York");
        let stages = Stages::new(
            Arc::new(store),
            Arc::new(MockOcr::new()),
            Arc::new(MockInference::failing("throttled")),
            TenantSource::default(),
        );
        let entries = vec![
            CaseEnvelope::from_json(r#"{"document": {"container": "docs", "key": "acme/missing.txt"}}"#)
                .unwrap(),
            CaseEnvelope::from_json(r#"{"document": {"container": "docs", "key": "acme/terms.txt"}}"#)
                .unwrap(),
        ];

        let outcomes = run_entries(&stages, entries).await;

        assert_eq!(outcomes.len(), 2);
        match &outcomes[0] {
            EntryOutcome::Failed { document_uri, error, .. } => {
                assert_eq!(document_uri, "s3://docs/acme/missing.txt");
                assert!(error.contains("missing.txt"), "{error}");
            }
            other => panic!("expected a failure, got {other:?}"),
        }
        match &outcomes[1] {
            EntryOutcome::Done(envelope) => assert!(envelope.decision.is_some()),
            other => panic!("expected a decided case, got {other:?}"),
        }

        let json = serde_json::to_value(&outcomes).unwrap();
        assert!(json[0]["error"].is_string());
        assert!(json[1]["decision"].is_object());
    }
}
