mod configuration;
mod error;
mod render;
mod repl;

use alice::agent::{Assistant, GenerationReport};
use alice::capabilities::{render_catalog, CapabilityCatalog};
use alice::credentials::RealEnvironment;
use alice::providers::registry::ModelRegistry;
use alice::store::MemoryStore;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cliclack::spinner;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::configuration::Settings;
use crate::render::{print_models, print_outcome, print_report, print_status};

const DEFAULT_LOG_FILTER: &str = "alice=info,alice_cli=info";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML); ALICE_* environment variables take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model to start with, overriding the configured default
    #[arg(short, long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message and print the reply
    Chat {
        message: String,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create the classes and assignments described in a syllabus file
    Syllabus {
        file: PathBuf,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create assignments from a description
    Generate {
        prompt: String,

        /// Class the new assignments belong to
        #[arg(long)]
        class_id: Option<i64>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start an interactive session (the default)
    Repl,
    /// List registry models and whether their credentials are set
    Models,
    /// List the capabilities Alice can use
    Tools,
    /// Show the current model, model availability and catalog size
    Status,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn build_assistant(cli: &Cli, settings: &Settings) -> Assistant {
    let catalog = Arc::new(CapabilityCatalog::new(
        settings.capability_provider.provider_command(),
    ));
    let preferred = cli.model.as_deref().unwrap_or(&settings.default_model);

    Assistant::start(
        ModelRegistry::builtin(),
        Some(preferred),
        catalog,
        Arc::new(MemoryStore::new()),
        Arc::new(RealEnvironment),
    )
    .await
}

async fn with_spinner<T>(message: &str, quiet: bool, task: impl Future<Output = T>) -> T {
    if quiet {
        return task.await;
    }
    let spin = spinner();
    spin.start(message);
    let value = task.await;
    spin.stop("");
    value
}

fn print_generation(report: GenerationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    } else {
        print_report(&report)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    let assistant = build_assistant(&cli, &settings).await;

    match cli.command.unwrap_or(Command::Repl) {
        Command::Chat { message, json } => {
            let outcome = with_spinner("thinking...", json, assistant.chat(&message)).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&outcome)?;
            }
        }
        Command::Syllabus { file, json } => {
            let syllabus = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let report =
                with_spinner("reading syllabus...", json, assistant.parse_syllabus(&syllabus))
                    .await?;
            print_generation(report, json)?;
        }
        Command::Generate {
            prompt,
            class_id,
            json,
        } => {
            let report = with_spinner(
                "generating assignments...",
                json,
                assistant.generate_assignments(&prompt, class_id),
            )
            .await?;
            print_generation(report, json)?;
        }
        Command::Repl => repl::run(&assistant).await?,
        Command::Models => print_models(&assistant.status().await),
        Command::Tools => {
            let tools = assistant.catalog().discover().await;
            println!("{}", render_catalog(&tools));
        }
        Command::Status => print_status(&assistant.status().await),
    }

    Ok(())
}
