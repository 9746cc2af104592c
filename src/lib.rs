pub mod config;
pub mod error;
pub mod logging;
pub mod materialize;
pub mod places;
pub mod scene;
pub mod shell;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use config::PlacesConfig;
use materialize::{MaterializeReport, materialize_results};
use places::{CompletionOutcome, PlaceResult, SearchQuery, SearchSession};
use scene::{SceneDocument, resolve_origin};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "anchors",
    version,
    about = "Search the Places API around a scene origin and clone anchors from the results"
)]
pub struct Cli {
    /// Path to places.toml (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API key (overrides PLACES_API_KEY and the config file)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Override the searchText endpoint URL
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one search around the scene origin and print the results
    Search {
        /// Scene document (JSON)
        #[arg(long)]
        scene: PathBuf,

        /// Free-text query (defaults to the configured query)
        #[arg(long)]
        query: Option<String>,

        /// Also clone the template anchor once per result and save the scene
        #[arg(long)]
        materialize: bool,

        /// Name of the anchor to clone (defaults to the only anchor)
        #[arg(long, requires = "materialize")]
        template: Option<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive session: search and create anchors as separate commands
    Shell {
        /// Scene document (JSON)
        #[arg(long)]
        scene: PathBuf,

        /// Name of the anchor to clone (defaults to the only anchor)
        #[arg(long)]
        template: Option<String>,
    },
    /// Print the request a search would send, without sending it
    Request {
        /// Scene document (JSON)
        #[arg(long)]
        scene: PathBuf,

        /// Free-text query (defaults to the configured query)
        #[arg(long)]
        query: Option<String>,
    },
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate man page to stdout
    Man,
}

/// JSON shape printed by `search --json`.
#[derive(Debug, Serialize)]
struct SearchOutput<'a> {
    request_id: String,
    query: &'a str,
    results: &'a [PlaceResult],
    #[serde(skip_serializing_if = "Option::is_none")]
    anchors: Option<&'a MaterializeReport>,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Search {
            scene,
            query,
            materialize,
            template,
            json,
        } => {
            let config = resolve_config(&cli)?;
            run_search(
                config,
                scene,
                query.as_deref(),
                materialize.then_some(template.as_deref()),
                *json,
            )
            .await
        }
        Commands::Shell { scene, template } => {
            let config = resolve_config(&cli)?;
            run_shell(config, scene, template.as_deref()).await
        }
        Commands::Request { scene, query } => {
            let config = resolve_config(&cli)?;
            print_request(&config, scene, query.as_deref())
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "anchors", &mut std::io::stdout());
            Ok(())
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            let mut out = std::io::stdout();
            man.render(&mut out)?;
            Ok(())
        }
    }
}

/// Layer CLI flags over file and environment config.
pub fn resolve_config(cli: &Cli) -> Result<PlacesConfig> {
    let mut config = PlacesConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(key) = &cli.api_key {
        config.api_key = key.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    Ok(config)
}

/// `materialize` is `Some(template)` when anchors should be created.
async fn run_search(
    config: PlacesConfig,
    scene_path: &Path,
    query: Option<&str>,
    materialize: Option<Option<&str>>,
    json: bool,
) -> Result<()> {
    let mut scene = SceneDocument::load(scene_path)?;
    let mut session = SearchSession::connect(config)?;

    session.start_search_with(&scene, query)?;
    let query_text = session
        .pending_query()
        .map(|q| q.text_query.clone())
        .unwrap_or_default();

    let request_id = match session.wait_for_completion().await {
        Some(CompletionOutcome::Succeeded { id, .. }) => id,
        Some(CompletionOutcome::Failed { error, .. }) => return Err(error.into()),
        Some(CompletionOutcome::Stale { id }) => anyhow::bail!("{id} was superseded"),
        None => anyhow::bail!("search ended without a completion"),
    };
    let results = session.last_results().unwrap_or_default();

    let report = match materialize {
        Some(template) => {
            let report = materialize_results(Some(results), &mut scene, template)?;
            let path = scene.save()?;
            info!(path = %path.display(), count = report.len(), "saved scene");
            Some(report)
        }
        None => None,
    };

    if json {
        let out = SearchOutput {
            request_id: request_id.to_string(),
            query: &query_text,
            results,
            anchors: report.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{} results for \"{query_text}\":", results.len());
        for place in results {
            println!("  {place}");
        }
        if let Some(report) = &report {
            println!("{} anchors created in {}", report.len(), scene_path.display());
        }
    }
    Ok(())
}

async fn run_shell(config: PlacesConfig, scene_path: &Path, template: Option<&str>) -> Result<()> {
    let mut scene = SceneDocument::load(scene_path)?;
    let mut session = SearchSession::connect(config)?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    shell::run_shell(&mut session, &mut scene, template, stdin, &mut stdout).await
}

/// Dry run: the request body and an equivalent curl command.
fn print_request(config: &PlacesConfig, scene_path: &Path, query: Option<&str>) -> Result<()> {
    let scene = SceneDocument::load(scene_path)?;
    let origin = resolve_origin(&scene)?;
    let text = query.unwrap_or(config.query_text.as_str());
    let request = SearchQuery::new(text, origin.latitude, origin.longitude)
        .to_request(&config.endpoint, &config.api_key);
    let body: serde_json::Value =
        serde_json::from_str(&request.body).context("re-reading request body")?;

    println!("POST {}", request.url);
    println!("{}", serde_json::to_string_pretty(&body)?);
    println!();
    println!("{}", request.to_curl());
    Ok(())
}
