use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use photo_archive_core::domain::TargetKind;

pub const ENV_LOG: &str = "PHOTO_ARCHIVE_LOG";
pub const ENV_CONFIG: &str = "PHOTO_ARCHIVE_CONFIG";
pub const ENV_SETTINGS_PREFIX: &str = "SETTINGS_PREFIX";
pub const ENV_REQUEST_QUEUE_URL: &str = "REQUEST_QUEUE_URL";
pub const ENV_METRICS_QUEUE_URL: &str = "DYNAMODB_METRICS_QUEUE_URL";
pub const ENV_REKOG_MIN_CONFIDENCE: &str = "REKOG_MIN_CONFIDENCE";
pub const ENV_REKOG_MAX_LABELS: &str = "REKOG_MAX_LABELS";

#[derive(Parser)]
#[command(name = "photo-archive")]
#[command(version, about = "Photo archive feature pipeline tools", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a JSON pipeline config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Prefix of the feature registry parameters
    #[arg(long, global = true, env = ENV_SETTINGS_PREFIX)]
    pub settings_prefix: Option<String>,

    #[arg(long, global = true, env = ENV_REQUEST_QUEUE_URL)]
    pub request_queue_url: Option<String>,

    /// Metrics queue url ("Invalid" disables metrics)
    #[arg(long, global = true, env = ENV_METRICS_QUEUE_URL)]
    pub metrics_queue_url: Option<String>,

    #[arg(long, global = true, env = ENV_REKOG_MIN_CONFIDENCE)]
    pub rekog_min_confidence: Option<f32>,

    #[arg(long, global = true, env = ENV_REKOG_MAX_LABELS)]
    pub rekog_max_labels: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decide the next step of an envelope
    Dispatch {
        /// Envelope JSON file ("-" for stdin)
        #[arg(long, short = 'e')]
        envelope: PathBuf,
    },

    /// Mark one feature completed and print the new envelope
    Advance {
        #[arg(long, short = 'e')]
        envelope: PathBuf,

        #[arg(long, short = 'f')]
        feature: String,
    },

    /// Summarize how far an envelope got
    Progress {
        #[arg(long, short = 'e')]
        envelope: PathBuf,
    },

    /// Compute the notification configuration after a custom-resource request
    Reconcile {
        #[arg(long, value_enum)]
        kind: KindArg,

        /// Custom-resource request JSON ("-" for stdin)
        #[arg(long, short = 'r')]
        request: PathBuf,

        /// Current bucket notification configuration JSON (empty when omitted)
        #[arg(long)]
        current: Option<PathBuf>,
    },

    /// Run files through an in-memory pipeline (hash, meta, rekog)
    Simulate {
        #[arg(long, short = 'b', default_value = "photos")]
        bucket: String,

        /// Feature to switch off before ingesting
        #[arg(long)]
        disable: Vec<String>,

        /// Label the recognition stub reports, as NAME:CONFIDENCE
        #[arg(long)]
        label: Vec<String>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Queue,
    Topic,
    Function,
}

impl From<KindArg> for TargetKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Queue => TargetKind::Queue,
            KindArg::Topic => TargetKind::Topic,
            KindArg::Function => TargetKind::Function,
        }
    }
}
