//! Enlil CLI
//!
//! Usage:
//!   enlil run <CONFIGURATION> [OUTPUT] [--settings <FILE>]
//!   enlil check <CONFIGURATION>
//!
//! Options:
//!   -v, --verbose  Log every pipeline step
//!   -h, --help     Print help

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use enlil::{decode, format_yaml_error, ArtifactPlan, EnlilError, Settings};

#[derive(Parser)]
#[command(name = "enlil")]
#[command(about = "Compile robotic deployment declarations into container artifacts")]
struct Cli {
    /// Log every pipeline step
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the compose file and package build contexts
    Run {
        /// Deployment configuration (YAML)
        configuration: PathBuf,

        /// Compose file to write (defaults to ./docker-compose.yml)
        output: Option<PathBuf>,

        /// Render settings file (TOML format)
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
    /// Load and decode a configuration without writing anything
    Check {
        /// Deployment configuration (YAML)
        configuration: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "enlil=debug" } else { "enlil=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Command::Run {
            configuration,
            output,
            settings,
        } => {
            let settings = match &settings {
                Some(path) => match Settings::from_file(path) {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("Error loading settings '{}': {}", path.display(), e);
                        std::process::exit(1);
                    }
                },
                None => Settings::default(),
            };
            let output = output.unwrap_or_else(|| Path::new(".").join(&settings.compose_file));

            let source = read_configuration(&configuration);
            let plan = decode(&source)
                .and_then(|graph| Ok(ArtifactPlan::build(&graph, &settings)?))
                .and_then(|plan| {
                    plan.write(&output)?;
                    Ok(plan)
                });
            match plan {
                Ok(plan) => info!(
                    output = %output.display(),
                    packages = plan.packages.len(),
                    "done"
                ),
                Err(e) => fail(&e, &source, &configuration),
            }
        }
        Command::Check { configuration } => {
            let source = read_configuration(&configuration);
            match decode(&source) {
                Ok(graph) => println!(
                    "{}: {} areas, {} robots, {} images, {} packages, {} global images",
                    configuration.display(),
                    graph.areas.len(),
                    graph.robots.len(),
                    graph.images.len(),
                    graph.packages.len(),
                    graph.global_images.len()
                ),
                Err(e) => fail(&e, &source, &configuration),
            }
        }
    }
}

/// Read a YAML configuration file or exit
fn read_configuration(path: &Path) -> String {
    if !path.is_file() {
        eprintln!(
            "Input configuration file \"{}\" does not exist.",
            path.display()
        );
        std::process::exit(1);
    }

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if !is_yaml {
        eprintln!(
            "Input configuration file \"{}\" must be a YAML file (.yaml or .yml).",
            path.display()
        );
        std::process::exit(1);
    }

    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn fail(error: &EnlilError, source: &str, configuration: &Path) -> ! {
    match error {
        EnlilError::Yaml(e) => {
            eprintln!(
                "{}",
                format_yaml_error(e, source, &configuration.display().to_string())
            );
        }
        e => eprintln!("Error: {}", e),
    }
    std::process::exit(1);
}
