use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use kcovid_core::config::{parse_cutoff_setting, Settings};
use kcovid_core::ingest::provider::{CaseSource, HttpCaseSource, JsonFileCaseSource};
use kcovid_core::load::{load_dashboard, FetchOutcome};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod tui;

#[derive(Debug, Parser)]
#[command(name = "kcovid_dashboard")]
#[command(about = "Monthly COVID-19 case dashboard for one country")]
struct Args {
    /// Country slug understood by the case API (overrides COVID_COUNTRY).
    #[arg(long)]
    country: Option<String>,

    /// Case API base URL (overrides COVID_API_BASE_URL).
    #[arg(long)]
    base_url: Option<String>,

    /// Exclude records from this month onward within its year, as YYYY-MM, or "none".
    #[arg(long)]
    cutoff: Option<String>,

    /// Read daily records from a JSON file instead of the case API.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Print the chart data as JSON instead of opening the dashboard.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let settings = resolve_settings(Settings::from_env()?, &args)?;
    let _sentry_guard = init_sentry(&settings);

    // The dashboard owns the whole TTY (stdout and stderr), so its logs go to a file.
    let (stderr_layer, file_layer, _log_guard) = match log_target(&args, &settings) {
        LogTarget::Stderr => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
            None,
        ),
        LogTarget::File(path) => {
            let (writer, guard) = tracing_appender::non_blocking(log_file_appender(&path)?);
            (
                None,
                Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(stderr_layer)
        .with(file_layer)
        .with(sentry_tracing::layer())
        .init();

    let source: Arc<dyn CaseSource> = match &args.input {
        Some(path) => Arc::new(JsonFileCaseSource::new(path)),
        None => Arc::new(HttpCaseSource::from_settings(&settings)?),
    };

    tracing::info!(
        country = %settings.country,
        source = source.source_name(),
        cutoff = ?settings.cutoff.map(|c| c.to_string()),
        json = args.json,
        "starting dashboard"
    );

    if args.json {
        return print_json(source, &settings).await;
    }

    tui::run(source, settings.cutoff, settings.country.clone()).await
}

const LOG_FILE_NAME: &str = "kcovid_dashboard.log";

#[derive(Debug, PartialEq)]
enum LogTarget {
    Stderr,
    File(PathBuf),
}

fn log_target(args: &Args, settings: &Settings) -> LogTarget {
    if args.json {
        LogTarget::Stderr
    } else {
        LogTarget::File(settings.log_dir.join(LOG_FILE_NAME))
    }
}

fn log_file_appender(path: &Path) -> anyhow::Result<RollingFileAppender> {
    let dir = path.parent().context("log path has no directory")?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("log path has no file name")?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

fn resolve_settings(mut settings: Settings, args: &Args) -> anyhow::Result<Settings> {
    if let Some(country) = &args.country {
        settings.country = country.trim().to_lowercase();
    }
    if let Some(base_url) = &args.base_url {
        settings.api_base_url = base_url.trim().to_string();
    }
    if let Some(cutoff) = &args.cutoff {
        settings.cutoff = parse_cutoff_setting(cutoff).context("--cutoff is invalid")?;
    }
    anyhow::ensure!(!settings.country.is_empty(), "country must be non-empty");
    Ok(settings)
}

async fn print_json(source: Arc<dyn CaseSource>, settings: &Settings) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let outcome = load_dashboard(source.as_ref(), settings.cutoff, &cancel).await;

    match outcome {
        Some(FetchOutcome::Loaded(charts)) => {
            let out = json!({
                "country": settings.country,
                "generated_at": chrono::Utc::now(),
                "cumulative": charts.cumulative,
                "active": charts.active,
                "breakdown": charts.breakdown,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        // Already logged at error level by the load, which also reports it to Sentry.
        Some(FetchOutcome::Failed { reason }) => {
            anyhow::bail!("failed to load case data: {reason}")
        }
        None => anyhow::bail!("interrupted before case data arrived"),
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
