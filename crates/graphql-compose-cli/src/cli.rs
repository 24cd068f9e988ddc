use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "graphql-compose")]
#[command(about = "Compose a GraphQL schema from entity types and extensions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project file
    #[arg(
        short,
        long,
        global = true,
        env = "GRAPHQL_COMPOSE_PROJECT",
        default_value = "graphql-compose.toml"
    )]
    pub project: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose the schema and print or write its SDL
    Build(BuildArgs),
    /// List the compiled object and interface types
    Types,
    /// Validate entity type and extension dependencies
    Check,
    /// Print the configuration fingerprint
    Fingerprint,
}

#[derive(clap::Args)]
pub struct BuildArgs {
    /// Write the SDL to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
