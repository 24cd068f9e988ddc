mod cli;
mod observability;
mod output;
mod project;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use graphql_compose::ComposeError;
use tracing::info;

use cli::{Cli, Commands};
use output::{print_error, print_success};
use project::Project;

fn main() {
    let cli = Cli::parse();
    observability::init_tracing_with_level(&cli.log_level);

    if let Err(e) = run(cli) {
        match e.downcast_ref::<ComposeError>() {
            Some(err) => print_error(&format!("[{}] {e:#}", err.error_code())),
            None => print_error(&format!("{e:#}")),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let format = cli.format.unwrap_or_default();
    let project = Project::load(&cli.project)?;
    info!(project = %cli.project.display(), "Loaded project");

    match &cli.command {
        Commands::Build(args) => {
            let (composer, config) = project.into_composer();
            let schema = composer.compose(&config)?;
            match &args.output {
                Some(path) => {
                    fs::write(path, &schema.sdl)
                        .with_context(|| format!("Cannot write {}", path.display()))?;
                    print_success(&format!(
                        "Wrote {} types to {}",
                        schema.type_names.len(),
                        path.display()
                    ));
                }
                None => print!("{}", schema.sdl),
            }
        }
        Commands::Types => {
            let (composer, config) = project.into_composer();
            let schema = composer.compose(&config)?;
            output::print_type_names(&schema.type_names, format)?;
        }
        Commands::Check => {
            let (composer, config) = project.into_composer();
            let active = composer.validate(&config)?;
            let enabled: Vec<&str> = config.enabled_entity_types().collect();
            eprintln!("{}: {}", "Entity types".cyan(), enabled.join(", "));
            eprintln!(
                "{}: {}",
                "Extensions".cyan(),
                active
                    .iter()
                    .map(|extension| extension.id())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            print_success("Configuration is valid");
        }
        Commands::Fingerprint => {
            output::print_fingerprint(&project.config.fingerprint()?, format)?;
        }
    }

    Ok(())
}
