mod cli;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use photo_archive_core::app::pipeline::LocalPipeline;
use photo_archive_core::app::reconciler::plan;
use photo_archive_core::app::JobProgress;
use photo_archive_core::config::PipelineConfig;
use photo_archive_core::domain::{
    CustomResourceRequest, JobEnvelope, NotificationConfiguration, advance, dispatch,
};
use photo_archive_core::impls::StaticLabelDetector;
use photo_archive_core::ports::{Label, SystemClock};

use crate::cli::{Cli, Commands, ENV_LOG};

/// Metrics queue value the deployed functions use for "no metrics".
const METRICS_DISABLED: &str = "Invalid";

/// Used by `simulate` when no metrics queue is configured.
const LOCAL_METRICS_QUEUE: &str = "local-metrics";

fn init_logging() {
    let filter = std::env::var(ENV_LOG)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    // stdout は JSON 出力用なのでログは stderr へ
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact()
        .with_env_filter(filter)
        .init();
}

/// File contents, or stdin for "-".
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read stdin")?;
        return Ok(body);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_envelope(path: &Path) -> Result<JobEnvelope> {
    let body = read_input(path)?;
    JobEnvelope::from_json(&body).with_context(|| format!("Invalid envelope in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Config file first, then flags / environment on top.
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(prefix) = &cli.settings_prefix {
        config.settings_prefix = prefix.clone();
    }
    if let Some(url) = &cli.request_queue_url {
        config.request_queue_url = url.clone();
    }
    if let Some(url) = &cli.metrics_queue_url {
        config.metrics_queue_url = (url != METRICS_DISABLED).then(|| url.clone());
    }
    if let Some(confidence) = cli.rekog_min_confidence {
        config.rekognition.min_confidence = confidence;
    }
    if let Some(max_labels) = cli.rekog_max_labels {
        config.rekognition.max_labels = max_labels;
    }

    config.validate().context("Invalid pipeline configuration")?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

fn parse_label(raw: &str) -> Result<Label> {
    let (name, confidence) = raw
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("label '{raw}' is not NAME:CONFIDENCE"))?;
    let confidence: f32 = confidence
        .parse()
        .with_context(|| format!("Invalid confidence in label '{raw}'"))?;
    Ok(Label {
        name: name.to_string(),
        confidence,
    })
}

async fn simulate(
    mut config: PipelineConfig,
    bucket: &str,
    disable: &[String],
    labels: &[String],
    files: &[std::path::PathBuf],
) -> Result<()> {
    if config.metrics_queue_url.is_none() {
        config.metrics_queue_url = Some(LOCAL_METRICS_QUEUE.to_string());
    }
    let labels = labels
        .iter()
        .map(|raw| parse_label(raw))
        .collect::<Result<Vec<_>>>()?;

    let pipeline = LocalPipeline::standard(
        config,
        Arc::new(StaticLabelDetector::new(labels)),
        Arc::new(SystemClock),
    )?;
    for feature in disable {
        pipeline.disable(feature);
    }

    let mut keys = Vec::with_capacity(files.len());
    for path in files {
        let key = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?
            .to_string();
        let body = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        pipeline.ingest(bucket, &key, body).await?;
        keys.push(key);
    }

    let report = pipeline.run_until_idle().await?;
    info!(
        invoked = report.dispatch.invoked,
        done = report.dispatch.done,
        stalled = report.dispatch.stalled,
        "simulation finished"
    );

    let mut objects = Vec::with_capacity(keys.len());
    for key in &keys {
        objects.push(json!({
            "key": key,
            "tags": pipeline.tags_of(bucket, key).await.unwrap_or_default(),
        }));
    }

    print_json(&json!({
        "report": report,
        "objects": objects,
        "metrics": pipeline.metrics_records().await,
    }))
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Dispatch { envelope } => {
            let envelope = read_envelope(envelope)?;
            print_json(&dispatch(&envelope))
        }
        Commands::Advance { envelope, feature } => {
            let envelope = read_envelope(envelope)?;
            let next = advance(&envelope, feature)
                .with_context(|| format!("Cannot advance feature '{feature}'"))?;
            print_json(&next)
        }
        Commands::Progress { envelope } => {
            let envelope = read_envelope(envelope)?;
            print_json(&JobProgress::of(&envelope))
        }
        Commands::Reconcile {
            kind,
            request,
            current,
        } => {
            if current.as_deref() == Some(Path::new("-")) && request == Path::new("-") {
                bail!("only one of --request / --current can read stdin");
            }
            let request: CustomResourceRequest = serde_json::from_str(&read_input(request)?)
                .context("Invalid custom-resource request")?;
            let current: NotificationConfiguration = match current {
                Some(path) => serde_json::from_str(&read_input(path)?)
                    .context("Invalid notification configuration")?,
                None => NotificationConfiguration::default(),
            };
            print_json(&plan((*kind).into(), &request, &current))
        }
        Commands::Simulate {
            bucket,
            disable,
            label,
            files,
        } => {
            let config = load_config(&cli)?;
            simulate(config, bucket, disable, label, files).await
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env は任意
    let _ = dotenvy::dotenv();
    init_logging();

    let cli = Cli::parse();
    run(cli).await
}
