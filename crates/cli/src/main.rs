//! Resource Optimization CLI
//!
//! A command-line view of the ROS systems table and of the
//! recommendations of a single system.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{recommendations, systems, Session};
use ros_lib::query::SortDirection;
use tracing_subscriber::EnvFilter;

/// Resource Optimization CLI
#[derive(Parser)]
#[command(name = "ros")]
#[command(author, version, about = "CLI for Resource Optimization", long_about = None)]
pub struct Cli {
    /// ROS API base URL (can also be set via ROS_API_URL env var)
    #[arg(long, env = "ROS_API_URL")]
    pub api_url: Option<String>,

    /// Inventory service base URL; systems are not merged with host data when unset
    #[arg(long, env = "ROS_INVENTORY_URL")]
    pub inventory_url: Option<String>,

    /// Bearer token for API requests
    #[arg(long, env = "ROS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// User the views are loaded for
    #[arg(long, env = "ROS_USER", default_value = "cli-user")]
    pub user: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Systems and their recommendations
    #[command(subcommand)]
    Systems(SystemsCommands),
}

#[derive(Subcommand)]
pub enum SystemsCommands {
    /// List systems with performance scores
    List {
        /// Page to show, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Systems per page
        #[arg(long)]
        per_page: Option<u32>,

        /// Column to sort by (e.g. display_name, cpu_score, memory_score, io_score)
        #[arg(long)]
        sort: Option<String>,

        /// Sort direction (asc or desc)
        #[arg(long)]
        direction: Option<SortDirection>,

        /// Filter by hostname or inventory id
        #[arg(long)]
        name: Option<String>,

        /// Skip the inventory merge
        #[arg(long)]
        no_inventory: bool,
    },

    /// Show recommendations of one system
    Recommendations {
        /// Inventory id of the system
        inventory_id: String,

        /// Page to show, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Recommendations per page
        #[arg(long)]
        per_page: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let file_config = config::Config::load()?;
    let session = Session::new(&cli, &file_config)?;

    match cli.command {
        Commands::Systems(systems_cmd) => match systems_cmd {
            SystemsCommands::List {
                page,
                per_page,
                sort,
                direction,
                name,
                no_inventory,
            } => {
                let args = systems::ListArgs {
                    page,
                    per_page,
                    sort,
                    direction,
                    name,
                    no_inventory,
                };
                systems::list_systems(&session, &args, cli.format).await?;
            }
            SystemsCommands::Recommendations {
                inventory_id,
                page,
                per_page,
            } => {
                recommendations::show_recommendations(
                    &session,
                    &inventory_id,
                    page,
                    per_page,
                    cli.format,
                )
                .await?;
            }
        },
    }

    Ok(())
}
