use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use cross_rate::{
    Catalog, CsvDirectorySource, ForecastOutcome, Holding, Instrument, Pipeline,
    PipelineConfig, PipelineResult, Portfolio, QuoteSource, YahooChartSource,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Base-currency rates, RSI and forecasts for a catalog of instruments
#[derive(Debug, Parser)]
#[command(name = "cross-rate", author, version, about)]
struct Cli {
    /// Where quotes come from
    #[arg(long, global = true, value_enum, default_value_t = SourceKind::Yahoo)]
    source: SourceKind,

    /// Directory of `<symbol>.csv` files for `--source csv`
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// TOML catalog; overrides CROSS_RATE_CATALOG
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Look-back period, e.g. 3mo, 1y, 5y
    #[arg(long, global = true)]
    period: Option<String>,

    /// Bar interval, e.g. 1d, 1wk
    #[arg(long, global = true)]
    interval: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    Yahoo,
    Csv,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List catalog instruments
    List,
    /// Run the pipeline for one instrument
    Run {
        name: String,
        /// Days to forecast; 0 skips the forecast
        #[arg(long, default_value_t = 0)]
        horizon: usize,
        #[arg(long)]
        no_indicator: bool,
    },
    /// Run the pipeline for several instruments (all when none are named)
    Batch {
        names: Vec<String>,
        #[arg(long, default_value_t = 0)]
        horizon: usize,
        #[arg(long)]
        no_indicator: bool,
    },
    /// Write an instrument's series as CSV
    Export {
        name: String,
        #[arg(short, long)]
        output: PathBuf,
        /// Export the source quotes instead of the derived series
        #[arg(long)]
        native: bool,
    },
    /// Value holdings at the latest prices
    Value {
        /// NAME=QUANTITY, repeatable
        #[arg(long = "holding", required = true)]
        holdings: Vec<Holding>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = PipelineConfig::from_env();
    if let Some(path) = &cli.catalog {
        config.catalog_path = Some(path.clone());
    }
    if let Some(period) = &cli.period {
        config.window.period = period.clone();
    }
    if let Some(interval) = &cli.interval {
        config.window.interval = interval.clone();
    }

    let catalog = config.load_catalog().context("loading catalog")?;
    let source = build_source(cli.source, &cli.data_dir)?;
    let pipeline = Pipeline::from_config(&config, source);

    match &cli.command {
        Command::List => list(&catalog, cli.json),
        Command::Run {
            name,
            horizon,
            no_indicator,
        } => {
            let instrument = catalog.require(name)?;
            let result = pipeline.run(instrument, *horizon, !no_indicator);
            print_results(&[result], cli.json)
        }
        Command::Batch {
            names,
            horizon,
            no_indicator,
        } => {
            let instruments = select(&catalog, names)?;
            let results = pipeline.run_batch(&instruments, *horizon, !no_indicator);
            print_results(&results, cli.json)
        }
        Command::Export {
            name,
            output,
            native,
        } => {
            let instrument = catalog.require(name)?;
            export(&pipeline, instrument, output, *native)
        }
        Command::Value { holdings } => {
            let portfolio: Portfolio = holdings.iter().cloned().collect();
            let names: Vec<String> = portfolio
                .holdings()
                .iter()
                .map(|h| h.instrument.clone())
                .collect();
            let instruments = select(&catalog, &names)?;
            let results = pipeline.run_batch(&instruments, 0, false);
            let valuation = portfolio.value_with(&results);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&valuation)?);
            } else {
                for line in &valuation.lines {
                    match (line.price, line.value) {
                        (Some(price), Some(value)) => println!(
                            "{:<16} {:>12.4} x {:>12.4} = {:>14.2}",
                            line.instrument, line.quantity, price, value
                        ),
                        _ => println!("{:<16} {:>12.4}   unpriced", line.instrument, line.quantity),
                    }
                }
                println!("{:<16} {:>45.2}", "total", valuation.total);
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_source(kind: SourceKind, data_dir: &Path) -> anyhow::Result<Arc<dyn QuoteSource>> {
    let source: Arc<dyn QuoteSource> = match kind {
        SourceKind::Yahoo => Arc::new(
            YahooChartSource::new(Duration::from_secs(15)).context("building HTTP client")?,
        ),
        SourceKind::Csv => {
            if !data_dir.is_dir() {
                bail!("data directory {} does not exist", data_dir.display());
            }
            Arc::new(CsvDirectorySource::new(data_dir))
        }
    };
    Ok(source)
}

fn select(catalog: &Catalog, names: &[String]) -> anyhow::Result<Vec<Instrument>> {
    if names.is_empty() {
        return Ok(catalog.instruments().to_vec());
    }
    names
        .iter()
        .map(|name| catalog.require(name).cloned().map_err(anyhow::Error::from))
        .collect()
}

fn list(catalog: &Catalog, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(catalog.instruments())?);
        return Ok(());
    }
    for instrument in catalog.iter() {
        println!(
            "{:<16} {:<12} {}",
            instrument.name(),
            instrument.symbol(),
            instrument.mode()
        );
    }
    Ok(())
}

fn print_results(results: &[PipelineResult], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    for result in results {
        println!("{} [{}]", result.instrument.name(), result.status);
        if let Some(message) = &result.message {
            println!("  {}", message);
        }
        if let Some(price) = result.latest_price {
            println!("  latest price   {:.4}", price);
        }
        if let Some(change) = result.price_change_pct {
            println!("  daily change   {:+.2}%", change);
        }
        if let (Some(change), Some(trend)) = (result.period_change_pct, result.trend) {
            println!("  period change  {:+.2}% ({:?})", change, trend);
        }
        if let Some((date, value)) = result.indicator.as_ref().and_then(|i| i.latest()) {
            let zone = rate_math::RsiZone::classify(value);
            println!("  RSI            {:.1} on {} ({})", value, date, zone);
        }
        match &result.forecast {
            ForecastOutcome::NotRequested => {}
            ForecastOutcome::Ready(forecast) => {
                for point in forecast.points() {
                    println!(
                        "  {}  {:.4}  [{:.4}, {:.4}]",
                        point.date, point.yhat, point.yhat_lower, point.yhat_upper
                    );
                }
            }
            ForecastOutcome::InsufficientHistory { required, actual } => {
                println!("  forecast needs {} points, have {}", required, actual);
            }
            ForecastOutcome::Unavailable { reason } => {
                println!("  forecast unavailable: {}", reason);
            }
        }
    }
    Ok(())
}

fn export(
    pipeline: &Pipeline,
    instrument: &Instrument,
    output: &Path,
    native: bool,
) -> anyhow::Result<()> {
    let series = if native {
        pipeline.fetch_native(instrument)?
    } else {
        let result = pipeline.derive_series(instrument);
        if result.series.is_empty() {
            bail!(
                "{}: {}",
                instrument.name(),
                result.message.unwrap_or_else(|| result.status.to_string())
            );
        }
        result.series
    };

    series
        .write_csv(output)
        .with_context(|| format!("writing {}", output.display()))?;
    tracing::info!(rows = series.len(), path = %output.display(), "exported series");
    Ok(())
}
