mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mnemos::config::MnemosConfig;
use mnemos::context::AppContext;

#[derive(Parser)]
#[command(name = "mnemos", version, about = "Fractal memory store, tool index and Python import analysis")]
struct Cli {
    /// Config file (default: ~/.mnemos/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store or overwrite the node at PATH
    Remember {
        path: String,
        content: String,
        #[arg(long, default_value = "")]
        summary: String,
        /// Keyword (repeatable)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,
        /// somatic, cognitive, metaphysical or a custom tier (default: classified)
        #[arg(long)]
        strata: Option<String>,
        /// Transcendence link (repeatable)
        #[arg(long = "up")]
        transcendence: Vec<String>,
        /// Immanence link (repeatable)
        #[arg(long = "down")]
        immanence: Vec<String>,
    },
    /// Print the node stored at PATH
    Recall {
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Find node paths by keyword and/or strata
    Find {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        strata: Option<String>,
        /// Restrict keyword matches to this namespace
        #[arg(long)]
        under: Option<String>,
    },
    /// Delete the node at PATH
    Forget { path: String },
    /// Add a cross-link from FROM to TO
    Link {
        from: String,
        to: String,
        /// transcendence (up) or immanence (down)
        #[arg(long, default_value = "transcendence")]
        direction: String,
    },
    /// Walk the transcendence or immanence lattice from PATH
    Traverse {
        path: String,
        #[arg(long, default_value = "transcendence")]
        direction: String,
        #[arg(long, default_value_t = 3)]
        depth: usize,
    },
    /// Show store statistics
    Stats,
    /// Index and search tool descriptions
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },
    /// Python import resolution
    Imports {
        #[command(subcommand)]
        action: ImportsAction,
    },
    /// Project dependency analysis
    Deps {
        #[command(subcommand)]
        action: DepsAction,
    },
    /// Run database diagnostics
    Doctor,
}

#[derive(Subcommand)]
enum ToolsAction {
    /// Scan the configured tool directories and index every valid document
    Index {
        #[arg(long)]
        force: bool,
    },
    /// Search indexed tools (criteria are combined with AND)
    Search {
        #[arg(long = "type")]
        tool_type: Option<String>,
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        intent: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print one tool's metadata
    Show { tool_id: String },
    /// Remove a tool from the store
    Unregister { tool_id: String },
    /// Counts by type and level
    Stats,
}

#[derive(Subcommand)]
enum ImportsAction {
    /// Resolve an import name as written in FILE
    Resolve {
        import_name: String,
        #[arg(long = "from")]
        from: PathBuf,
    },
}

#[derive(Subcommand)]
enum DepsAction {
    /// Recursively analyse imports starting from the given files or directories
    Analyze {
        #[arg(required = true)]
        seeds: Vec<PathBuf>,
        #[arg(long)]
        max_depth: Option<usize>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MnemosConfig::load_from(path)?,
        None => MnemosConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Doctor => cli::doctor::doctor(&config),
        Command::Imports {
            action: ImportsAction::Resolve { import_name, from },
        } => cli::imports::resolve(&config, &import_name, &from),
        Command::Deps {
            action:
                DepsAction::Analyze {
                    seeds,
                    max_depth,
                    json,
                },
        } => cli::deps::analyze(&config, &seeds, max_depth, json),
        command => {
            let mut ctx = AppContext::open(config)?;
            run_store_command(&mut ctx, command)
        }
    }
}

/// Commands that need the memory store.
fn run_store_command(ctx: &mut AppContext, command: Command) -> Result<()> {
    match command {
        Command::Remember {
            path,
            content,
            summary,
            keywords,
            strata,
            transcendence,
            immanence,
        } => cli::memory::remember(
            ctx,
            cli::memory::RememberArgs {
                path,
                content,
                summary,
                keywords,
                strata,
                transcendence,
                immanence,
            },
        ),
        Command::Recall { path, json } => cli::memory::recall(ctx, &path, json),
        Command::Find {
            keyword,
            strata,
            under,
        } => cli::memory::find(ctx, keyword.as_deref(), strata.as_deref(), under.as_deref()),
        Command::Forget { path } => cli::memory::forget(ctx, &path),
        Command::Link {
            from,
            to,
            direction,
        } => cli::memory::link(ctx, &from, &to, &direction),
        Command::Traverse {
            path,
            direction,
            depth,
        } => cli::memory::traverse(ctx, &path, &direction, depth),
        Command::Stats => cli::stats::stats(ctx),
        Command::Tools { action } => match action {
            ToolsAction::Index { force } => cli::tools::index(ctx, force),
            ToolsAction::Search {
                tool_type,
                keyword,
                level,
                intent,
                limit,
            } => cli::tools::search(
                ctx,
                tool_type.as_deref(),
                keyword,
                level.as_deref(),
                intent,
                limit,
            ),
            ToolsAction::Show { tool_id } => cli::tools::show(ctx, &tool_id),
            ToolsAction::Unregister { tool_id } => cli::tools::unregister(ctx, &tool_id),
            ToolsAction::Stats => cli::tools::stats(ctx),
        },
        Command::Doctor | Command::Imports { .. } | Command::Deps { .. } => Ok(()),
    }
}
