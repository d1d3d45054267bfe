//! Research crew CLI: run, train, replay and test the crew.

use clap::{Parser, Subcommand};
use latest_ai_development::config::Settings;
use latest_ai_development::crew::{Crew, CrewError};
use latest_ai_development::entrypoints;
use latest_ai_development::project::LatestAiDevelopment;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Research the latest AI developments with a hierarchical crew of agents
#[derive(Parser)]
#[command(name = "latest_ai_development")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the crew and write report.md
    Run,

    /// Train the crew with human feedback
    Train {
        /// Number of training iterations
        n_iterations: String,
        /// File the trained agents data is saved to
        filename: String,
    },

    /// Replay the latest kickoff from a specific task
    Replay {
        /// Id of the task to replay from
        task_id: String,
    },

    /// Test the crew and score its outputs with another model
    Test {
        /// Number of test iterations
        n_iterations: String,
        /// Model used to evaluate the outputs
        eval_llm: String,
    },

    /// Show the task outputs of the latest kickoff
    LogTasksOutputs,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "latest_ai_development={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}

/// Crew built from the environment's settings and definitions
async fn assemble_crew() -> Result<Crew, CrewError> {
    let project = LatestAiDevelopment::new(Settings::from_env())?;
    project.crew().await
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run => {
            let output = entrypoints::run(assemble_crew()).await?;
            println!("{}", output.raw);
        }
        Commands::Train { n_iterations, filename } => {
            let argv = vec!["train".to_string(), n_iterations, filename];
            entrypoints::train(assemble_crew(), &argv).await?;
        }
        Commands::Replay { task_id } => {
            let argv = vec!["replay".to_string(), task_id];
            let output = entrypoints::replay(assemble_crew(), &argv).await?;
            println!("{}", output.raw);
        }
        Commands::Test { n_iterations, eval_llm } => {
            let argv = vec!["test".to_string(), n_iterations, eval_llm];
            let report = entrypoints::test(assemble_crew(), &argv).await?;
            println!("{}", report);
        }
        Commands::LogTasksOutputs => {
            let crew = assemble_crew().await?;
            let rows = crew.stored_task_outputs().await?;
            if rows.is_empty() {
                println!("No task outputs logged yet. Run the crew first.");
            }
            for row in rows {
                println!(
                    "Task {}: {}\n  id: {}\n  replayed: {}\n  at: {}",
                    row.task_index + 1,
                    row.output.summary,
                    row.task_id,
                    row.was_replayed,
                    row.timestamp.to_rfc3339()
                );
            }
        }
    }
    Ok(())
}
