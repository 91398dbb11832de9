mod scenarios;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

use mapcheck_browser::BrowserSession;
use mapcheck_core::report::ConsoleReporter;
use mapcheck_core::runner::{RunnerConfig, ScenarioRunner};
use mapcheck_core::scenario::{Scenario, Viewport};
use mapcheck_core::{ScenarioStatus, VerificationResult};

#[derive(Parser)]
#[command(
    name = "mapcheck",
    version,
    about = "Browser-based verification scenarios for the map application"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Target application URL
    #[arg(long, env = "MAPCHECK_URL", default_value = "http://localhost:8000", global = true)]
    url: String,

    /// Directory screenshots are written to
    #[arg(long, default_value = "verification", global = true)]
    shots_dir: PathBuf,

    /// Overall deadline per scenario, in seconds
    #[arg(long, global = true)]
    deadline_secs: Option<u64>,

    /// Print the full result as JSON on stdout
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the application renders at least one place on first load
    InitialLoad,

    /// Verify searching narrows the rendered markers
    Search {
        /// Search term to submit
        #[arg(long, default_value = "tapas")]
        term: String,

        /// Expected number of markers after the search
        #[arg(long, default_value_t = 1)]
        expect: usize,
    },

    /// Verify clicking a list item opens a matching detail panel
    Detail {
        #[command(flatten)]
        bounds: BoundsArgs,
    },

    /// Verify panning the map triggers a refetch without errors
    Refetch {
        #[command(flatten)]
        bounds: BoundsArgs,
    },

    /// Verify cluster rendering after zooming out
    Clustering,

    /// Dump the injected initial state and capture a screenshot
    Snapshot,

    /// Run every scenario in sequence
    All {
        #[command(flatten)]
        bounds: BoundsArgs,
    },
}

/// Initial viewport, encoded into the target URL as query parameters.
/// Defaults cover the Catalonia/Andorra area the seed data populates.
#[derive(Args)]
struct BoundsArgs {
    #[arg(long, default_value_t = 42.50)]
    min_lat: f64,

    #[arg(long, default_value_t = 1.52)]
    min_lon: f64,

    #[arg(long, default_value_t = 42.52)]
    max_lat: f64,

    #[arg(long, default_value_t = 1.53)]
    max_lon: f64,
}

impl From<&BoundsArgs> for Viewport {
    fn from(args: &BoundsArgs) -> Self {
        Viewport {
            min_lat: args.min_lat,
            min_lon: args.min_lon,
            max_lat: args.max_lat,
            max_lon: args.max_lon,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mapcheck=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let url = Url::parse(&cli.url).with_context(|| format!("invalid target URL: {}", cli.url))?;
    let shots = cli.shots_dir.as_path();

    let scenarios: Vec<Scenario> = match &cli.command {
        Commands::InitialLoad => vec![scenarios::initial_load(url)],
        Commands::Search { term, expect } => {
            vec![scenarios::search_filter(url, term, *expect, shots)]
        }
        Commands::Detail { bounds } => vec![scenarios::item_detail(url, bounds.into())],
        Commands::Refetch { bounds } => {
            vec![scenarios::viewport_refetch(url, bounds.into(), shots)]
        }
        Commands::Clustering => vec![scenarios::clustering(url, shots)],
        Commands::Snapshot => vec![scenarios::snapshot(url, shots)],
        Commands::All { bounds } => vec![
            scenarios::initial_load(url.clone()),
            scenarios::search_filter(url.clone(), "tapas", 1, shots),
            scenarios::item_detail(url.clone(), bounds.into()),
            scenarios::viewport_refetch(url.clone(), bounds.into(), shots),
            scenarios::clustering(url.clone(), shots),
            scenarios::snapshot(url, shots),
        ],
    };

    let results = run_scenarios(scenarios, cli.deadline_secs.map(Duration::from_secs)).await?;

    for result in results.iter().filter(|r| r.status == ScenarioStatus::Failed) {
        tracing::warn!(
            scenario = %result.scenario,
            "Scenario completed with failed checks"
        );
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    // Non-zero only when a scenario never completed its setup; assertion
    // mismatches warn but exit zero.
    let code = results.iter().map(|r| r.exit_code()).max().unwrap_or(0);
    Ok(ExitCode::from(code as u8))
}

/// Run scenarios sequentially, one fresh page each, over one shared
/// browser process. Ctrl-C cancels the in-flight scenario and skips the
/// rest; whatever was captured is still reported.
async fn run_scenarios(
    scenarios: Vec<Scenario>,
    deadline: Option<Duration>,
) -> Result<Vec<VerificationResult>> {
    let session = BrowserSession::launch()
        .await
        .context("failed to launch headless browser")?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling run");
                cancel.cancel();
            }
        });
    }

    let mut results = Vec::with_capacity(scenarios.len());
    for scenario in &scenarios {
        if cancel.is_cancelled() {
            break;
        }

        let page = session
            .new_page()
            .await
            .context("failed to open a page for the scenario")?;
        let runner = ScenarioRunner::with_config(
            page,
            RunnerConfig {
                deadline,
                ..RunnerConfig::default()
            },
        );
        let result = runner
            .run_with_cancellation(scenario, &ConsoleReporter, cancel.child_token())
            .await;
        results.push(result);
    }

    Ok(results)
}
