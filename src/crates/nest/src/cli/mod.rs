//! CLI framework for the nest client
//!
//! Provides subcommands for browsing feeds, managing saved articles,
//! signing in and watching the push channel.

pub mod handlers;
pub mod output;

use clap::{Parser, Subcommand};

/// nest - News Nest terminal client
#[derive(Parser, Debug)]
#[command(name = "nest")]
#[command(version = crate::version::VERSION)]
#[command(long_version = crate::version::VERSION_INFO)]
#[command(about = "Browse, search and save News Nest articles with live updates")]
#[command(long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (json, table, plain)
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
    Plain,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            "plain" => Ok(OutputFormat::Plain),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize nest configuration for a project
    Init,

    /// Show current configuration
    Config,

    /// Store a bearer token for later commands
    Login {
        /// User name shown in status output
        #[arg(short, long)]
        user: Option<String>,

        /// JWT issued by the News Nest auth service
        #[arg(short, long, env = "NEST_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Forget the stored bearer token
    Logout,

    /// Show the main feed
    Feed {
        /// Only show articles in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Number of pages to load
        #[arg(short, long, default_value = "1")]
        pages: u32,
    },

    /// Search articles
    Search {
        /// Search terms
        #[arg(value_name = "QUERY")]
        query: String,

        /// Number of pages to load
        #[arg(short, long, default_value = "1")]
        pages: u32,
    },

    /// Show saved articles
    Saved,

    /// Show articles from followed topics and outlets
    Personalized,

    /// Save an article
    Save {
        /// Article URL
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Remove an article from the saved list
    Unsave {
        /// Article URL
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Follow the live feed until interrupted
    Watch,
}
