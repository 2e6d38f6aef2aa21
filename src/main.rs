//! Binary entry point for taskdeck.
//!
//! This binary provides the CLI interface for the taskdeck task tracker:
//! the MCP server plus a couple of local inspection commands.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow printing in the main binary for CLI output
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskdeck::config::TaskdeckConfig;
use taskdeck::mcp::McpServer;
use taskdeck::models::{Priority, Status};
use taskdeck::observability;
use taskdeck::rendering;
use taskdeck::service::{ListFilter, TaskService};

/// Taskdeck - a task tracking backend for AI coding assistants.
#[derive(Parser)]
#[command(name = "taskdeck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server over stdio.
    Serve,

    /// Show the active backend and collection summary.
    Status,

    /// Render the task collection to stdout.
    List {
        /// Filter by status (pending, in_progress, completed).
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by priority (low, medium, high).
        #[arg(short, long)]
        priority: Option<String>,

        /// Filter by category (case-insensitive exact match).
        #[arg(long)]
        category: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    observability::init(cli.verbose);

    let config = match &cli.config {
        Some(path) => {
            let mut config = TaskdeckConfig::load_from_file(path)?;
            config.apply_env();
            config
        },
        None => TaskdeckConfig::load_default(),
    };

    match cli.command {
        Commands::Serve => {
            let service = TaskService::from_config(&config)?;
            let server = McpServer::new(service);
            server.run_stdio()?;
        },
        Commands::Status => {
            let service = TaskService::from_config(&config)?;
            let collection = service.load_collection()?;
            println!("Backend:      {}", service.backend_name());
            println!("Data dir:     {}", config.data_dir.display());
            println!("Tasks:        {}", collection.tasks.len());
            println!("Last updated: {}", collection.last_updated.to_rfc3339());
            service.close()?;
        },
        Commands::List {
            status,
            priority,
            category,
        } => {
            let filter = ListFilter {
                status: status.as_deref().and_then(Status::parse),
                priority: priority.as_deref().and_then(Priority::parse),
                category,
            };
            let service = TaskService::from_config(&config)?;
            let report = service.list(&filter)?;
            println!("{}", rendering::render_list(&report));
            service.close()?;
        },
    }

    Ok(())
}
