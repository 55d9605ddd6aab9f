//! branchy: inspect a Branchy unit tree from the command line
//!
//! Seeds an in-memory backend from `branchy.toml`, pulls units and the tree
//! through a [`BranchyStore`], and prints what was asked for.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use branchy_sdk::{BranchyStore, MemoryBackend, Node};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;

#[derive(Parser)]
#[command(name = "branchy")]
#[command(about = "Inspect a Branchy unit tree")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "branchy.toml", env = "BRANCHY_CONFIG")]
    config: PathBuf,

    /// Agent the store acts as
    #[arg(short, long, default_value = "me", env = "BRANCHY_AGENT")]
    agent: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List every unit with its path and state
    Units,
    /// Print the materialized tree
    Tree,
    /// Show the node at a dotted path
    Find { path: String },
    /// List the paths below a dotted path
    Paths {
        #[arg(default_value = "")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, found) = Config::load(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    if found {
        info!(config = %cli.config.display(), "Loaded config");
    } else {
        info!(config = %cli.config.display(), "Config file not found, using defaults");
    }

    let backend = MemoryBackend::new(&config.store.signals);
    let store = BranchyStore::new(
        Arc::new(backend.port(cli.agent.as_str())),
        config.store.clone(),
    );

    let seeds = config.seed_units();
    if !seeds.is_empty() {
        store.initialize(seeds).await?;
    }
    store.pull_units().await?;
    store.pull_tree().await?;

    match cli.command.unwrap_or(Command::Tree) {
        Command::Units => print_units(&store),
        Command::Tree => {
            println!("{}", store.tree_name());
            print_node(&store.tree(), 0);
        }
        Command::Find { path } => match store.find_in_tree(&path) {
            Some(node) => {
                println!("{} ({} children)", node.name(), node.children.len());
                for unit in node.units() {
                    println!("  {} {}", unit.hash, unit.state);
                }
            }
            None => {
                eprintln!("No node at `{}`", path);
                std::process::exit(1);
            }
        },
        Command::Paths { path } => {
            for p in store.branch_paths(&path) {
                println!("{}", p);
            }
        }
    }

    Ok(())
}

fn print_units(store: &BranchyStore) {
    let mut paths: Vec<_> = store.unit_paths().into_iter().collect();
    paths.sort();
    for (path, hash) in paths {
        let state = store
            .unit_info(&hash)
            .map(|info| info.state)
            .unwrap_or_default();
        println!("{:<24} {:<9} {}", path, state, hash);
    }
}

fn print_node(node: &Node, depth: usize) {
    let marker = if node.units().is_empty() { "" } else { " *" };
    println!("{}{}{}", "  ".repeat(depth), node.name(), marker);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}
