mod api;
mod commands;
mod config;
mod mealdb;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::api::BackendClient;
use crate::commands::{
    ExportFormat, Theme, UiConfig, cmd_delete, cmd_export, cmd_filters, cmd_note, cmd_random,
    cmd_save, cmd_saved, cmd_search,
};
use crate::config::Config;
use crate::mealdb::MealDbClient;
use mealbook_core::service::RecipeService;
use mealbook_core::view::{MealFilter, SortKey};

#[derive(Parser)]
#[command(
    name = "mealbook",
    version,
    about = "Search TheMealDB and bookmark recipes with your own notes"
)]
struct Cli {
    /// Table style: light or dark
    #[arg(long, global = true, default_value = "light")]
    theme: Theme,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search TheMealDB by name
    Search {
        /// Search term (empty lists a default selection)
        #[arg(default_value = "")]
        term: String,
        /// Only meals in this category (e.g. Chicken, Dessert)
        #[arg(short, long)]
        category: Option<String>,
        /// Only meals from this area (e.g. Japanese, Italian)
        #[arg(short, long)]
        area: Option<String>,
        /// Only meals carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Sort by: name, category, area, recent (upstream order)
        #[arg(short, long, default_value = "recent")]
        sort: SortKey,
        /// Show ingredients and instructions for every result
        #[arg(long)]
        details: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a random meal, optionally saving it
    Random {
        /// Save the meal to your recipes
        #[arg(long)]
        save: bool,
        /// Notes to store with the saved meal
        #[arg(short, long, default_value = "")]
        notes: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List valid categories, areas and tags for filtering
    Filters {
        /// Search term used to collect tags
        #[arg(long)]
        term: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save a TheMealDB meal by its id
    Save {
        /// TheMealDB meal id (e.g. 52772)
        meal_id: String,
        /// Notes to store with the recipe
        #[arg(short, long, default_value = "")]
        notes: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved recipes
    Saved {
        /// Sort by: name, category, area, recent (newest first)
        #[arg(short, long, default_value = "recent")]
        sort: SortKey,
        /// Only recipes whose tags contain this text
        #[arg(short, long)]
        tag: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit the notes of a saved recipe
    Note {
        /// Meal id of the saved recipe
        meal_id: String,
        /// New notes (an empty string clears them)
        text: String,
        /// Add a line to the existing notes instead of replacing them
        #[arg(long)]
        append: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved recipe
    Delete {
        /// Meal id of the saved recipe
        meal_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export a saved recipe as Markdown, text or JSON
    Export {
        /// Meal id of the saved recipe
        meal_id: String,
        /// Format: markdown, text, json
        #[arg(short, long, default_value = "markdown")]
        format: ExportFormat,
        /// Output file (default: derived from the recipe name; JSON prints to stdout)
        #[arg(short, long, value_name = "PATH")]
        output: Option<std::path::PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the recipe API server
    Serve {
        /// Port to listen on (default: $PORT or 5000)
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

fn init_tracing(serving: bool) {
    let default_filter = if serving { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Commands::Serve { .. }));

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let ui = UiConfig::new(cli.theme);
    let meals = MealDbClient::new(&config.mealdb_url)?;
    let backend = BackendClient::new(&config.api_url)?;

    match cli.command {
        Commands::Search {
            term,
            category,
            area,
            tag,
            sort,
            details,
            json,
        } => {
            let filter = MealFilter {
                category,
                area,
                tag,
            };
            cmd_search(&meals, &ui, &term, &filter, sort, details, json).await
        }
        Commands::Random { save, notes, json } => {
            cmd_random(&meals, &backend, &ui, save, &notes, json).await
        }
        Commands::Filters { term, json } => cmd_filters(&meals, term.as_deref(), json).await,
        Commands::Save {
            meal_id,
            notes,
            json,
        } => cmd_save(&meals, &backend, &meal_id, &notes, json).await,
        Commands::Saved { sort, tag, json } => {
            cmd_saved(&backend, &ui, sort, tag.as_deref(), json).await
        }
        Commands::Note {
            meal_id,
            text,
            append,
            json,
        } => cmd_note(&backend, &meal_id, &text, append, json).await,
        Commands::Delete { meal_id, json } => cmd_delete(&backend, &meal_id, json).await,
        Commands::Export {
            meal_id,
            format,
            output,
            json,
        } => cmd_export(&backend, &meal_id, format, output.as_deref(), json).await,
        Commands::Serve { port, bind } => {
            let recipes = match RecipeService::new(&config.db_path) {
                Ok(svc) => svc,
                Err(e) => {
                    error!(
                        "Failed to open recipe store at {}: {e:#}",
                        config.db_path.display()
                    );
                    process::exit(1);
                }
            };
            server::start_server(recipes, meals, port.unwrap_or(config.port), &bind).await
        }
    }
}
