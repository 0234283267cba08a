//! CLI entry point for the carrier scorecard tool.
//!
//! Provides subcommands for summarizing a flight-records CSV, printing the
//! per-carrier scorecard, listing the best and worst performers, checking
//! data quality, and rendering charts.

use anyhow::{Context, Result};
use carrier_scorecard::analyzers::scorecard::create_scorecard_by;
use carrier_scorecard::charts::{
    BAR_CHART_SIZE, SCATTER_CHART_SIZE, plot_cancellation_rates, plot_delay_rates,
    plot_delay_vs_cancellation,
};
use carrier_scorecard::output::{
    identify_best_performers, identify_worst_performers, print_data_quality, print_scorecard,
    print_summary_stats, render_scorecard_json,
};
use carrier_scorecard::{FlightTable, GroupBy, load_and_validate};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "carrier_scorecard")]
#[command(about = "Delay and cancellation scorecards for airline flight records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print dataset-wide summary statistics
    Summary {
        /// Flight-records CSV file
        #[arg(value_name = "FILE")]
        data: PathBuf,
    },
    /// Print the scorecard: delay rate, cancellation rate and average delay per group
    Scorecard {
        #[arg(value_name = "FILE")]
        data: PathBuf,

        /// Grouping key: carrier, year, month, year-month or carrier-year
        #[arg(short, long, default_value = "carrier")]
        group_by: GroupBy,

        /// Print the scorecard as JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the groups with the highest delay rate
    Worst {
        #[arg(value_name = "FILE")]
        data: PathBuf,

        /// Number of groups to list
        #[arg(short, default_value_t = 3)]
        n: usize,

        #[arg(short, long, default_value = "carrier")]
        group_by: GroupBy,
    },
    /// List the groups with the lowest delay rate
    Best {
        #[arg(value_name = "FILE")]
        data: PathBuf,

        /// Number of groups to list
        #[arg(short, default_value_t = 3)]
        n: usize,

        #[arg(short, long, default_value = "carrier")]
        group_by: GroupBy,
    },
    /// Report missing values, duplicate rows and out-of-range flags
    Quality {
        #[arg(value_name = "FILE")]
        data: PathBuf,
    },
    /// Render a scorecard chart to an SVG file
    Chart {
        #[arg(value_name = "FILE")]
        data: PathBuf,

        #[arg(short, long, value_enum, default_value_t = ChartKind::Delay)]
        kind: ChartKind,

        /// Where to write the SVG
        #[arg(short, long, default_value = "scorecard.svg")]
        out: PathBuf,

        /// Do not highlight the worst performer on the delay chart
        #[arg(long, default_value_t = false)]
        no_highlight: bool,

        #[arg(short, long, default_value = "carrier")]
        group_by: GroupBy,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChartKind {
    /// Delay rate bars
    Delay,
    /// Cancellation rate bars
    Cancellation,
    /// Delay rate vs. cancellation rate scatter
    Scatter,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/carrier_scorecard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("carrier_scorecard.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { data } => {
            let table = load(&data)?;
            print_summary_stats(&table);
        }
        Commands::Scorecard {
            data,
            group_by,
            json,
        } => {
            let table = load(&data)?;
            let scorecard = create_scorecard_by(&table, group_by);
            if json {
                println!("{}", render_scorecard_json(&scorecard, group_by)?);
            } else {
                print_scorecard(&scorecard);
            }
        }
        Commands::Worst { data, n, group_by } => {
            let table = load(&data)?;
            identify_worst_performers(&create_scorecard_by(&table, group_by), n);
        }
        Commands::Best { data, n, group_by } => {
            let table = load(&data)?;
            identify_best_performers(&create_scorecard_by(&table, group_by), n);
        }
        Commands::Quality { data } => {
            let table = load(&data)?;
            print_data_quality(&table);
        }
        Commands::Chart {
            data,
            kind,
            out,
            no_highlight,
            group_by,
        } => {
            render_chart(&data, kind, &out, !no_highlight, group_by)?;
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<FlightTable> {
    load_and_validate(path).with_context(|| format!("loading {}", path.display()))
}

/// Builds the scorecard for `data` and writes the requested chart as SVG.
#[tracing::instrument(skip(data, out), fields(data = %data.display(), out = %out.display()))]
fn render_chart(
    data: &Path,
    kind: ChartKind,
    out: &Path,
    highlight_worst: bool,
    group_by: GroupBy,
) -> Result<()> {
    let table = load(data)?;
    let scorecard = create_scorecard_by(&table, group_by);

    let chart = match kind {
        ChartKind::Delay => plot_delay_rates(&scorecard, BAR_CHART_SIZE, highlight_worst)?,
        ChartKind::Cancellation => plot_cancellation_rates(&scorecard, BAR_CHART_SIZE)?,
        ChartKind::Scatter => plot_delay_vs_cancellation(&scorecard, SCATTER_CHART_SIZE)?,
    };

    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(out, &chart.svg).with_context(|| format!("writing {}", out.display()))?;

    info!(title = %chart.title, bytes = chart.svg.len(), "Chart written");
    Ok(())
}
