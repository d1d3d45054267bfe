//! Command drivers: fixed inputs, argument parsing and error wrapping around a crew.
//!
//! Each driver takes the future assembling its crew, so definition and
//! storage failures are reported like any other failure of the command.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Datelike;
use std::future::Future;

use crate::crew::{Crew, CrewError, CrewOutput, EvaluationReport};
use crate::task::Inputs;

pub const TOPIC: &str = "AI LLMs";

/// What the drivers need from a crew
#[async_trait]
pub trait CrewRunner: Send {
    async fn kickoff(&mut self, inputs: Inputs) -> Result<CrewOutput, CrewError>;
    async fn train(&mut self, n_iterations: u32, filename: &str, inputs: Inputs) -> Result<(), CrewError>;
    async fn replay(&mut self, task_id: &str) -> Result<CrewOutput, CrewError>;
    async fn test(&mut self, n_iterations: u32, eval_llm: &str, inputs: Inputs) -> Result<EvaluationReport, CrewError>;
}

#[async_trait]
impl CrewRunner for Crew {
    async fn kickoff(&mut self, inputs: Inputs) -> Result<CrewOutput, CrewError> {
        Crew::kickoff(self, inputs).await
    }

    async fn train(&mut self, n_iterations: u32, filename: &str, inputs: Inputs) -> Result<(), CrewError> {
        Crew::train(self, n_iterations, filename, inputs).await
    }

    async fn replay(&mut self, task_id: &str) -> Result<CrewOutput, CrewError> {
        Crew::replay(self, task_id).await
    }

    async fn test(&mut self, n_iterations: u32, eval_llm: &str, inputs: Inputs) -> Result<EvaluationReport, CrewError> {
        Crew::test(self, n_iterations, eval_llm, inputs).await
    }
}

/// `topic` plus `current_year`
pub fn default_inputs() -> Inputs {
    Inputs::from([
        ("topic".to_string(), TOPIC.to_string()),
        ("current_year".to_string(), chrono::Local::now().year().to_string()),
    ])
}

fn arg<'a>(argv: &'a [String], index: usize, name: &str) -> Result<&'a str, String> {
    argv.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing argument <{}>", name))
}

fn iterations_arg(argv: &[String]) -> Result<u32, String> {
    let raw = arg(argv, 1, "n_iterations")?;
    raw.trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid literal for n_iterations: '{}' ({})", raw, e))
}

/// Run the crew
pub async fn run<R, F>(assemble: F) -> Result<CrewOutput>
where
    R: CrewRunner,
    F: Future<Output = Result<R, CrewError>>,
{
    let outcome: Result<CrewOutput, CrewError> = async {
        let mut crew = assemble.await?;
        crew.kickoff(default_inputs()).await
    }
    .await;
    outcome.map_err(|e| anyhow!("An error occurred while running the crew: {}", e))
}

/// Train the crew for `argv[1]` iterations, saving to `argv[2]`
pub async fn train<R, F>(assemble: F, argv: &[String]) -> Result<()>
where
    R: CrewRunner,
    F: Future<Output = Result<R, CrewError>>,
{
    let outcome: Result<(), String> = async {
        let n_iterations = iterations_arg(argv)?;
        let filename = arg(argv, 2, "filename")?;
        let mut crew = assemble.await.map_err(|e| e.to_string())?;
        crew.train(n_iterations, filename, default_inputs())
            .await
            .map_err(|e| e.to_string())
    }
    .await;
    outcome.map_err(|e| anyhow!("An error occurred while training the crew: {}", e))
}

/// Replay the crew execution from the task `argv[1]`
pub async fn replay<R, F>(assemble: F, argv: &[String]) -> Result<CrewOutput>
where
    R: CrewRunner,
    F: Future<Output = Result<R, CrewError>>,
{
    let outcome: Result<CrewOutput, String> = async {
        let task_id = arg(argv, 1, "task_id")?;
        let mut crew = assemble.await.map_err(|e| e.to_string())?;
        crew.replay(task_id).await.map_err(|e| e.to_string())
    }
    .await;
    outcome.map_err(|e| anyhow!("An error occurred while replaying the crew: {}", e))
}

/// Test the crew for `argv[1]` iterations, scored by the model `argv[2]`
pub async fn test<R, F>(assemble: F, argv: &[String]) -> Result<EvaluationReport>
where
    R: CrewRunner,
    F: Future<Output = Result<R, CrewError>>,
{
    let outcome: Result<EvaluationReport, String> = async {
        let n_iterations = iterations_arg(argv)?;
        let eval_llm = arg(argv, 2, "eval_llm")?;
        let mut crew = assemble.await.map_err(|e| e.to_string())?;
        crew.test(n_iterations, eval_llm, default_inputs())
            .await
            .map_err(|e| e.to_string())
    }
    .await;
    outcome.map_err(|e| anyhow!("An error occurred while testing the crew: {}", e))
}
