//! schedsync CLI
//!
//! Fetches the class or work schedule from the web portal, inspects saved exports
//! and runs the periodic re-sync.

#![allow(clippy::print_stdout)]

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, bail};
use application::{ApplicationError, SchedulePort, ScheduleService, SyncResult};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use domain::{Credentials, DomainError, RetrievalOutcome, RetrievalRequest, TargetDate};
use infrastructure::{
    AppConfig, PortalScheduleAdapter, RequestFactory, SyncEvent, SyncOutcome, SyncScheduler,
    TelemetryConfig, init_telemetry,
};
use presentation_cli::{files, observer::ConsoleObserver, output};
use tracing::info;

/// schedsync CLI
#[derive(Parser)]
#[command(name = "schedsync-cli")]
#[command(author, version, about = "Fetch the class or work schedule from the web portal", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: ./config.toml if present)
    #[arg(short, long, global = true, env = "SCHEDSYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and fetch the schedule
    ///
    /// Year and month default to the current month. Without --day the whole
    /// month is requested.
    ///
    /// Example: schedsync-cli fetch --month 3 --json
    Fetch {
        /// Year (default: current year)
        #[arg(long)]
        year: Option<i32>,

        /// Month 1-12 (default: current month)
        #[arg(long)]
        month: Option<u32>,

        /// Day of month; omit to fetch the whole month
        #[arg(long)]
        day: Option<u32>,

        /// Print events as JSON
        #[arg(long, conflicts_with = "raw")]
        json: bool,

        /// Write the raw export instead of decoded events
        #[arg(long)]
        raw: bool,

        /// Base64-encode raw output
        #[arg(long, requires = "raw")]
        base64: bool,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Per-operation timeout in seconds (default: portal.timeout_secs)
        #[arg(long)]
        timeout: Option<u64>,

        /// Give up after this many seconds overall
        #[arg(long)]
        deadline: Option<u64>,

        /// Suppress progress lines
        #[arg(short, long)]
        quiet: bool,
    },

    /// Decode a saved export
    Decode {
        /// Export file
        file: PathBuf,

        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a file looks like calendar data
    Sniff {
        /// File to inspect
        file: PathBuf,
    },

    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Re-sync on a cron schedule until Ctrl-C
    Watch {
        /// Cron expression overriding sync.cron (6 fields)
        #[arg(long)]
        cron: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML (without the password)
    Show,
    /// Validate the configuration
    Check,
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Fill in missing date parts from `today`; a missing day means the whole month
fn resolve_target(
    today: NaiveDate,
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
) -> Result<TargetDate, DomainError> {
    TargetDate::new(
        year.unwrap_or_else(|| today.year()),
        month.unwrap_or_else(|| today.month()),
        day.unwrap_or(0),
    )
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::load().context("failed to load configuration")?,
    };
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

fn require_credentials(config: &AppConfig) -> anyhow::Result<Credentials> {
    config
        .credentials()
        .context("credentials missing: set SCHEDSYNC_USERNAME and SCHEDSYNC_PASSWORD")
}

/// User-facing error text, with the diagnostic hint when there is one
fn describe(err: &ApplicationError) -> String {
    match err {
        ApplicationError::Retrieval {
            message,
            hint: Some(hint),
            ..
        } => format!("{message} ({hint})"),
        other => other.to_string(),
    }
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
        },
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        },
    }
}

fn render_events(events: &[domain::CalendarEvent], json: bool) -> anyhow::Result<String> {
    if json {
        Ok(output::render_json(events)? + "\n")
    } else {
        Ok(output::render_table(events))
    }
}

fn print_sync_event(event: &SyncEvent) {
    let at = event.completed_at.with_timezone(&Local).format("%H:%M:%S");
    match &event.outcome {
        SyncOutcome::Loaded { events } => {
            println!("[{at}] ✅ {events} event(s) loaded in {}ms", event.duration_ms);
        },
        SyncOutcome::Empty => println!("[{at}] 📭 export contained no events"),
        SyncOutcome::Skipped => println!("[{at}] ⏭️  previous sync still running, skipped"),
        SyncOutcome::Failed { message, .. } => println!("[{at}] ❌ {message}"),
    }
}

#[allow(clippy::fn_params_excessive_bools)]
#[allow(clippy::too_many_arguments)]
async fn fetch(
    config: &AppConfig,
    target: TargetDate,
    json: bool,
    raw: bool,
    base64: bool,
    output_path: Option<&Path>,
    timeout: Option<u64>,
    deadline: Option<u64>,
    quiet: bool,
) -> anyhow::Result<()> {
    let credentials = require_credentials(config)?;

    let mut request = RetrievalRequest::for_target(credentials, target);
    if let Some(secs) = timeout {
        request = request.with_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = deadline {
        request = request.with_deadline(Instant::now() + Duration::from_secs(secs));
    }

    let adapter = PortalScheduleAdapter::from_config(config)?
        .with_observer(Arc::new(ConsoleObserver::new(quiet)));

    if raw {
        return match adapter.retrieve(request).await {
            RetrievalOutcome::Success { raw_bytes } => {
                write_output(output_path, &output::raw_output(&raw_bytes, base64))
            },
            RetrievalOutcome::Failure { message, hint, .. } => match hint {
                Some(hint) => bail!("{message} ({hint})"),
                None => bail!("{message}"),
            },
        };
    }

    let service = ScheduleService::new(Arc::new(adapter));
    let result = match service.sync(request).await {
        Ok(result) => result,
        Err(e) => bail!(describe(&e)),
    };

    if let SyncResult::Loaded(snapshot) = &result {
        info!(encoding = %snapshot.encoding, events = snapshot.events.len(), "Fetched schedule");
    }
    let rendered = render_events(result.events(), json)?;
    write_output(output_path, rendered.as_bytes())
}

async fn watch(config: &AppConfig, cron: Option<String>) -> anyhow::Result<()> {
    if !config.sync.enabled && cron.is_none() {
        bail!("scheduled sync is disabled (sync.enabled = false)");
    }
    let cron = cron.unwrap_or_else(|| config.sync.cron.clone());
    let credentials = require_credentials(config)?;

    let adapter = PortalScheduleAdapter::from_config(config)?;
    let service = Arc::new(ScheduleService::new(Arc::new(adapter)));
    let scheduler = SyncScheduler::new().await?;
    let mut events = scheduler
        .take_event_receiver()
        .context("scheduler event channel already taken")?;

    let requests: RequestFactory = Arc::new(move || {
        let today = Local::now().date_naive();
        RetrievalRequest::new(credentials.clone(), today.year(), today.month(), 0)
    });

    scheduler
        .schedule_sync(&cron, Arc::clone(&service), Arc::clone(&requests))
        .await?;
    if config.sync.run_on_start {
        scheduler.run_now(&service, requests()).await;
    }
    scheduler.start().await?;
    println!("⏰ Syncing on \"{cron}\", press Ctrl-C to stop");

    loop {
        tokio::select! {
            Some(event) = events.recv() => print_sync_event(&event),
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            },
        }
    }

    scheduler.stop().await?;
    let stats = scheduler.stats();
    println!(
        "Stopped after {} successful, {} failed, {} skipped sync(s)",
        stats.success_count, stats.failure_count, stats.skipped_count
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Fetch { .. } | Commands::Config { .. } | Commands::Watch { .. } => {
            Some(load_config(cli.config.as_deref())?)
        },
        Commands::Decode { .. } | Commands::Sniff { .. } => None,
    };

    let telemetry = match (&config, &cli.command) {
        (Some(config), Commands::Watch { .. }) if cli.verbose == 0 => config.telemetry.clone(),
        _ => TelemetryConfig {
            log_filter: log_filter_from_verbosity(cli.verbose).to_string(),
            json: config.as_ref().is_some_and(|c| c.telemetry.json),
        },
    };
    init_telemetry(&telemetry)?;

    match cli.command {
        Commands::Fetch {
            year,
            month,
            day,
            json,
            raw,
            base64,
            output,
            timeout,
            deadline,
            quiet,
        } => {
            let config = config.context("configuration not loaded")?;
            let target = resolve_target(Local::now().date_naive(), year, month, day)?;
            fetch(
                &config,
                target,
                json,
                raw,
                base64,
                output.as_deref(),
                timeout,
                deadline,
                quiet,
            )
            .await?;
        },

        Commands::Decode { file, json } => {
            let report = files::decode_file(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            if !json {
                println!("📄 {} ({})", file.display(), report.encoding);
            }
            print!("{}", render_events(&report.events, json)?);
        },

        Commands::Sniff { file } => {
            let report = files::sniff_file(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            println!("{}: {report}", file.display());
            if !report.is_calendar {
                std::process::exit(1);
            }
        },

        Commands::Config { action } => {
            let config = config.context("configuration not loaded")?;
            match action {
                ConfigAction::Show => print!("{}", config.to_toml()?),
                ConfigAction::Check => {
                    println!("✅ Configuration is valid");
                    if config.credentials().is_none() {
                        println!("⚠️  No credentials: set SCHEDSYNC_USERNAME and SCHEDSYNC_PASSWORD");
                    }
                },
            }
        },

        Commands::Watch { cron } => {
            let config = config.context("configuration not loaded")?;
            watch(&config, cron).await?;
        },
    }

    Ok(())
}
