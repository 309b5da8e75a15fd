//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "prodex",
    version,
    about = "Hybrid lexical + vector search over heterogeneous product catalogs",
    long_about = "Prodex ingests product catalog exports in dataset-specific shapes, indexes them \
                  under one collection per (dataset, embedding model) pair, and serves ranked \
                  hybrid queries that blend lexical relevance with vector similarity."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/prodex/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a dataset source file into every applicable collection
    Index {
        /// Dataset key with a configured schema
        #[arg(short, long)]
        dataset: String,

        /// Newline-delimited JSON source file
        file: PathBuf,
    },

    /// Run a hybrid (or pure vector) search against one collection
    Search {
        /// Query text
        query: String,

        /// Embedding model key
        #[arg(short, long)]
        model: String,

        /// Dataset key
        #[arg(short, long)]
        dataset: String,

        /// Maximum number of results to return
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Rank by vector similarity alone, skipping the lexical signal
        #[arg(long)]
        vector_only: bool,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Page through raw documents of one collection, bypassing scoring
    List {
        /// Dataset key
        #[arg(short, long)]
        dataset: String,

        /// Embedding model key
        #[arg(short, long)]
        model: String,

        /// Zero-based page number
        #[arg(long, default_value = "0")]
        page: usize,

        /// Page size
        #[arg(long, default_value = "20")]
        size: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Print the resolved configuration
    Show,

    /// Validate a configuration file
    Validate {
        /// File to validate (defaults to the active config path)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}
