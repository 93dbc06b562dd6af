use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use correlheat_core::config::Settings;
use correlheat_core::ingest::{HttpJsonPriceProvider, JsonFilePriceProvider, PriceHistoryProvider};
use correlheat_core::request::{CorrelationForm, PartialForm};
use correlheat_core::CorrelError;

mod table;

#[derive(Debug, Parser)]
#[command(name = "correlheat", about = "Correlation heatmap of daily returns")]
struct Args {
    /// Ticker symbols separated by spaces or commas.
    #[arg(long, short)]
    tickers: Option<String>,

    /// Start date (YYYY-MM-DD). Defaults to DEFAULT_LOOKBACK_DAYS before today.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD), exclusive. Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// `log` or `pct`.
    #[arg(long, short = 'r')]
    return_type: Option<String>,

    /// Read prices from a JSON file instead of the HTTP provider. Falls back to PRICES_FILE.
    #[arg(long)]
    prices_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Print values without ANSI background colors.
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let form = CorrelationForm::with_defaults(settings.default_lookback_days).merge(PartialForm {
        tickers: args.tickers.clone(),
        start: args.start.clone(),
        end: args.end.clone(),
        return_type: args.return_type.clone(),
    });
    let request = form.validate()?;

    let prices_file = args.prices_file.clone().or_else(|| settings.prices_file.clone());
    let provider: Arc<dyn PriceHistoryProvider> = match &prices_file {
        Some(path) => Arc::new(JsonFilePriceProvider::new(path)),
        None => Arc::new(HttpJsonPriceProvider::from_settings(&settings)?),
    };

    tracing::info!(
        provider = provider.provider_name(),
        tickers = ?request.tickers,
        start = %request.start,
        end = %request.end,
        return_type = %request.return_type,
        "computing correlations"
    );

    let report = match correlheat_core::run_request(provider.as_ref(), &request).await {
        Ok(report) => report,
        Err(err) => {
            if matches!(err, CorrelError::MissingDependency(_)) {
                let e = anyhow::Error::new(err.clone());
                sentry_anyhow::capture_anyhow(&e);
            }
            return Err(err).context("correlation run failed");
        }
    };

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{json}");
        }
        OutputFormat::Table => {
            print!("{}", table::render(&report.table, !args.no_color));
            println!("{}", report.status_message());
        }
    }

    Ok(())
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
