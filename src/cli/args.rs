//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::loader::{Overflow, Ownership};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Live queries over change-notifying providers
#[derive(Parser)]
#[command(
    name = "livequery",
    version = env!("CARGO_PKG_VERSION"),
    about = "Live queries over change-notifying providers",
    long_about = "Turn point-in-time queries into streams that reload whenever the data changes.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .livequery directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show active settings
    #[command(about = "Display active settings")]
    Config,

    /// Run a live query against an in-memory artists table
    #[command(
        about = "Watch a live query react to inserts",
        after_help = "Examples:\n  livequery demo\n  livequery demo --updates 5 --overflow buffer\n  livequery demo --ownership consumer"
    )]
    Demo {
        /// Rows to insert after the initial load
        #[arg(short, long, default_value_t = 3)]
        updates: usize,

        /// Overflow policy (overrides config): latest, error, buffer, block
        #[arg(long)]
        overflow: Option<Overflow>,

        /// Handle ownership (overrides config): engine, consumer
        #[arg(long)]
        ownership: Option<Ownership>,
    },
}
