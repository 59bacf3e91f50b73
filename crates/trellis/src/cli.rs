//! Command-line arguments.
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Trellis: inspect and verify a plugin installation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Runtime setup file (.json, .yaml or .toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Plugin descriptor file or directory to scan; may be repeated
    #[arg(long = "plugin-path", short = 'p', global = true)]
    pub plugin_paths: Vec<PathBuf>,

    /// Preprocessor constant to define while reading descriptors; may be repeated
    #[arg(long = "define", short = 'D', global = true)]
    pub defines: Vec<String>,

    /// Always scan plugin paths instead of using the metadata cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Directory holding the plugin metadata cache
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered plugins with their services and components
    List,
    /// Resolve every enabled plugin, service and component
    Verify,
}
