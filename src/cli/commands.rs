//! CLI arguments and parsing

use clap::Parser;
use std::path::PathBuf;

/// Fetch every page of one or more GitLab listing endpoints
#[derive(Parser, Debug)]
#[command(name = "gitlab-gather")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// API base URL (overrides the config file)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Private access token (overrides the config file)
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Number of concurrent page workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Maximum number of pages per listing (0 = unlimited)
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Report errors on a separate stream
    #[arg(long)]
    pub dual: bool,

    /// Output format
    #[arg(short, long, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Listing paths relative to the base URL (e.g. "projects")
    #[arg(required = true)]
    pub paths: Vec<String>,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per page, one per line
    Json,
    /// Indented JSON
    Pretty,
}
