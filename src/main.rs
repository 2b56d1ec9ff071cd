//! Case Review Monitor - terminal host
//!
//! Follows one case through the review pipeline, either live over the
//! producer's WebSocket or from a recorded frame file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use case_review_monitor::models::settings::{ConfigUpdate, MonitorConfig};
use case_review_monitor::services::monitor::CaseMonitor;
use case_review_monitor::services::presentation::{render_text, ConnectionState, MonitorView};
use case_review_monitor::services::transport::{
    ReplayPace, ReplayTransport, WebSocketConfig, WebSocketTransport,
};
use case_review_monitor::services::HistoryClient;
use case_review_monitor::storage::ConfigService;
use case_review_monitor::utils::paths::recordings_dir;
use case_review_pacing::{DelayGenerator, FixedDelay, PacingConfig};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Case Review Monitor CLI
#[derive(Parser)]
#[command(name = "case-review-monitor")]
#[command(about = "Follow a compliance case review as it runs", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CASE_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "CASE_MONITOR_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "CASE_MONITOR_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch a case live until its narrative closes
    Watch {
        /// Case to observe
        #[arg(long)]
        case: String,

        /// WebSocket endpoint
        #[arg(long, env = "CASE_MONITOR_WS_URL")]
        url: Option<String>,

        /// Base URL of the case API used for history backfill
        #[arg(long, env = "CASE_MONITOR_API_URL")]
        api: Option<String>,

        /// Record received frames under the recordings directory
        #[arg(long)]
        record: bool,

        /// Record received frames to this file
        #[arg(long)]
        record_to: Option<PathBuf>,

        /// Skip history backfill
        #[arg(long)]
        no_history: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Replay a recorded frame file through the same pipeline
    Replay {
        /// JSON-lines recording
        file: PathBuf,

        /// Case to observe (defaults to the first case in the recording)
        #[arg(long)]
        case: Option<String>,

        /// Reproduce the recorded gaps between frames
        #[arg(long)]
        realtime: bool,

        /// Skip pacing waits
        #[arg(long)]
        instant: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Inspect or reset the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Change stored settings; unset flags keep their current value
    Set {
        #[arg(long)]
        ws_url: Option<String>,

        #[arg(long)]
        api_base_url: Option<String>,

        #[arg(long)]
        reconnect_interval_secs: Option<u64>,

        #[arg(long)]
        keepalive_interval_secs: Option<u64>,

        #[arg(long)]
        event_log_capacity: Option<usize>,

        #[arg(long)]
        history_backfill: Option<bool>,
    },
    /// Restore defaults
    Reset,
    /// Print the configuration file location
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn open_config(path: Option<PathBuf>) -> anyhow::Result<ConfigService> {
    let service = match path {
        Some(path) => ConfigService::open(path)?,
        None => ConfigService::new()?,
    };
    Ok(service)
}

fn print_view(view: &MonitorView, output: OutputFormat) -> anyhow::Result<()> {
    match output {
        OutputFormat::Text => println!("{}", render_text(view)),
        OutputFormat::Json => println!("{}", serde_json::to_string(view)?),
    }
    Ok(())
}

async fn watch(
    config: MonitorConfig,
    case_id: String,
    record_to: Option<PathBuf>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    let mut transport = WebSocketTransport::new(WebSocketConfig::from(&config))?;
    if let Some(path) = record_to {
        transport = transport.with_recording(path);
    }

    let mut monitor = CaseMonitor::new(config.clone(), Arc::new(transport));
    if config.history_backfill {
        monitor = monitor.with_history(Arc::new(HistoryClient::from_config(&config)?));
    }

    let handle = monitor.spawn();
    handle.watch(case_id.clone()).await?;

    let mut views = handle.views();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("[Monitor] Interrupted, stopping");
                break;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if let Some(view) = view {
                    print_view(&view, output)?;
                    if view.closed.is_some() {
                        break;
                    }
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

async fn replay(
    mut config: MonitorConfig,
    file: PathBuf,
    case_id: Option<String>,
    realtime: bool,
    instant: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let transport = ReplayTransport::from_file(&file)
        .with_context(|| format!("failed to read recording {}", file.display()))?;
    let case_id = match case_id {
        Some(case_id) => case_id,
        None => transport
            .first_case_id()
            .context("recording has no case events, pass --case")?,
    };
    let pace = if realtime {
        ReplayPace::Recorded
    } else {
        ReplayPace::Immediate
    };

    config.history_backfill = false;
    if instant {
        config.pacing = config.pacing.without_delays();
    }
    let mut monitor = CaseMonitor::new(config, Arc::new(transport.with_pace(pace)));
    if instant {
        monitor = monitor.with_delays(|_: &PacingConfig| -> Box<dyn DelayGenerator> {
            Box::new(FixedDelay::base())
        });
    }

    let mut handle = monitor.spawn();
    handle.watch(case_id.clone()).await?;
    // Settled once the narrative has closed and the recording is exhausted.
    let view = handle
        .wait_until(&case_id, |view| {
            view.closed.is_some() && view.connection == ConnectionState::Disconnected
        })
        .await;
    handle.shutdown().await;

    print_view(&view?, output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only rendered views
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let mut service = open_config(cli.config)?;

    match cli.command {
        Command::Watch {
            case,
            url,
            api,
            record,
            record_to,
            no_history,
            output,
        } => {
            let mut config = service.get_config_clone();
            config.apply_update(ConfigUpdate {
                ws_url: url,
                api_base_url: api,
                history_backfill: no_history.then_some(false),
                ..Default::default()
            });
            let record_to = match (record_to, record) {
                (Some(path), _) => Some(path),
                (None, true) => Some(recordings_dir()?.join(format!("{}.jsonl", case))),
                (None, false) => None,
            };
            watch(config, case, record_to, output).await
        }
        Command::Replay {
            file,
            case,
            realtime,
            instant,
            output,
        } => replay(service.get_config_clone(), file, case, realtime, instant, output).await,
        Command::Config { action } => {
            match action {
                ConfigAction::Show => {
                    println!("{}", serde_json::to_string_pretty(service.get_config())?)
                }
                ConfigAction::Set {
                    ws_url,
                    api_base_url,
                    reconnect_interval_secs,
                    keepalive_interval_secs,
                    event_log_capacity,
                    history_backfill,
                } => {
                    let updated = service.update_config(ConfigUpdate {
                        ws_url,
                        api_base_url,
                        reconnect_interval_secs,
                        keepalive_interval_secs,
                        event_log_capacity,
                        history_backfill,
                        ..Default::default()
                    })?;
                    println!("{}", serde_json::to_string_pretty(&updated)?);
                }
                ConfigAction::Reset => {
                    service.reset()?;
                    println!("Configuration reset: {}", service.path().display());
                }
                ConfigAction::Path => println!("{}", service.path().display()),
            }
            Ok(())
        }
    }
}
