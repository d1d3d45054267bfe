use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::execution::TaskHook;
use super::feedback::FeedbackSource;
use super::{Crew, CrewError, TaskOutput, UsageMetrics};
use crate::agent::{Agent, AgentRole};
use crate::storage::JsonFileHandler;
use crate::task::{Inputs, JsonFieldType, Task};
use crate::tools::SharedAgent;

/// One human review of a task output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingEntry {
    pub iteration: usize,
    pub initial_output: String,
    pub human_feedback: String,
    pub improved_output: String,
}

/// Raw training entries keyed by agent role
pub type TrainingData = BTreeMap<String, Vec<TrainingEntry>>;

/// What the training evaluator distilled for one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedAgentData {
    pub suggestions: Vec<String>,
    pub quality: f64,
    pub final_summary: String,
}

/// Trained-agents file contents, keyed by agent role
pub type TrainedAgentSuggestions = BTreeMap<String, TrainedAgentData>;

/// Training entries of one `train` call, written to the training data file after every review
#[derive(Debug)]
pub(crate) struct TrainingSession {
    pub iteration: usize,
    pub data: TrainingData,
    file: JsonFileHandler,
}

impl TrainingSession {
    /// Start a session with an emptied training data file
    pub(crate) fn start(file: JsonFileHandler) -> Result<Self, CrewError> {
        let data = TrainingData::new();
        file.save(&data)?;
        Ok(Self { iteration: 0, data, file })
    }

    /// Ask for feedback on `output` and, when some is given, have the agent redo the task
    pub(crate) async fn review(
        &mut self,
        feedback: &dyn FeedbackSource,
        agent: &SharedAgent,
        task: &Task,
        context: Option<&str>,
        output: TaskOutput,
        usage: &mut UsageMetrics,
    ) -> Result<TaskOutput, CrewError> {
        let human_feedback = feedback.collect(task, &output).await?;

        let improved = if human_feedback.is_empty() {
            output.clone()
        } else {
            let note = format!(
                "User feedback: {}\nInstructions: Use this feedback to enhance the next output iteration.",
                human_feedback
            );
            let context = match context {
                Some(context) => format!("{}\n\n{}", context, note),
                None => note,
            };

            let mut agent = agent.lock().await;
            info!(agent = %agent.role.role, iteration = self.iteration, "redoing task with feedback");
            let response = agent.execute_task(task, Some(&context)).await?;
            usage.add_response(&response);
            TaskOutput::new(task, agent.role.role.clone(), response.content)
        };

        self.data.entry(output.agent.clone()).or_default().push(TrainingEntry {
            iteration: self.iteration,
            initial_output: output.raw,
            human_feedback,
            improved_output: improved.raw.clone(),
        });
        self.file.save(&self.data)?;
        Ok(improved)
    }
}

impl Crew {
    /// Run `n_iterations` kickoffs with human feedback after each task, then
    /// distill per-agent suggestions into `filename`
    pub async fn train(&mut self, n_iterations: u32, filename: &str, inputs: Inputs) -> Result<(), CrewError> {
        if n_iterations == 0 {
            return Err(CrewError::Validation(
                "the number of training iterations must be a positive integer".to_string(),
            ));
        }
        if filename.trim().is_empty() {
            return Err(CrewError::Validation("a file name for the trained agents data is required".to_string()));
        }

        let mut session = TrainingSession::start(JsonFileHandler::new(&self.training_data_file))?;
        for iteration in 0..n_iterations as usize {
            info!(iteration, n_iterations, "training iteration");
            session.iteration = iteration;
            self.kickoff_with_hook(inputs.clone(), TaskHook::Training(&mut session)).await?;
        }

        let trained_file = JsonFileHandler::new(filename);
        let mut trained: TrainedAgentSuggestions = trained_file.load()?;
        for (role, entries) in &session.data {
            let Some(agent) = self.agent_with_role(role).await else {
                warn!(role = %role, "no agent with this role, skipping training evaluation");
                continue;
            };
            let data = evaluate_training_data(&agent, role, entries).await?;
            info!(role = %role, quality = data.quality, suggestions = data.suggestions.len(), "agent trained");
            trained.insert(role.clone(), data);
        }
        trained_file.save(&trained)?;
        Ok(())
    }

    async fn agent_with_role(&self, role: &str) -> Option<SharedAgent> {
        for agent in self.all_agents() {
            if agent.lock().await.role.matches(role) {
                return Some(agent);
            }
        }
        None
    }
}

/// Evaluator bound to the trained agent's own model
async fn evaluate_training_data(
    agent: &SharedAgent,
    role: &str,
    entries: &[TrainingEntry],
) -> Result<TrainedAgentData, CrewError> {
    let mut evaluator = {
        let agent = agent.lock().await;
        Agent::new(
            AgentRole::new(
                "Training Evaluator".to_string(),
                "Distill human feedback on an agent's work into instructions for its future tasks".to_string(),
                "You review training sessions and turn reviewer feedback into clear, reusable guidance".to_string(),
            ),
            agent.llm_config.clone(),
            agent.provider.clone(),
        )
    };

    let task = Task::new_simple_json(
        training_evaluation_prompt(role, entries),
        "The quality of the training data, the action items and a summary of the training".to_string(),
        vec![
            ("suggestions".to_string(), JsonFieldType::Array(Box::new(JsonFieldType::String))),
            ("quality".to_string(), JsonFieldType::Number),
            ("final_summary".to_string(), JsonFieldType::String),
        ],
        true,
    );

    let response = evaluator.execute_task(&task, None).await?;
    Ok(serde_json::from_str(&response.content)?)
}

fn training_evaluation_prompt(role: &str, entries: &[TrainingEntry]) -> String {
    let mut prompt = format!(
        "Assess the quality of the training data of the agent '{}' based on its outputs, the human \
         feedback and the improved outputs.\n\n",
        role
    );
    for entry in entries {
        prompt.push_str(&format!(
            "Iteration: {}\nInitial Output:\n{}\n\nHuman Feedback:\n{}\n\nImproved Output:\n{}\n\n",
            entry.iteration,
            entry.initial_output,
            if entry.human_feedback.is_empty() { "(accepted as is)" } else { entry.human_feedback.as_str() },
            entry.improved_output
        ));
    }
    prompt.push_str(
        "Based on the human feedback and the comparison between initial and improved outputs, provide a list \
         of clear, actionable instructions to improve the quality of future outputs, a quality score from 0 to \
         10 and a final summary of the training.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_every_iteration() {
        let entries = vec![
            TrainingEntry {
                iteration: 0,
                initial_output: "draft one".to_string(),
                human_feedback: "add sources".to_string(),
                improved_output: "draft one with sources".to_string(),
            },
            TrainingEntry {
                iteration: 1,
                initial_output: "draft two".to_string(),
                human_feedback: String::new(),
                improved_output: "draft two".to_string(),
            },
        ];

        let prompt = training_evaluation_prompt("Researcher", &entries);
        assert!(prompt.contains("'Researcher'"));
        assert!(prompt.contains("Iteration: 0\nInitial Output:\ndraft one"));
        assert!(prompt.contains("add sources"));
        assert!(prompt.contains("(accepted as is)"));
    }

    #[test]
    fn test_trained_data_serializes_by_role() {
        let trained = TrainedAgentSuggestions::from([(
            "Researcher".to_string(),
            TrainedAgentData {
                suggestions: vec!["Cite sources".to_string()],
                quality: 7.5,
                final_summary: "Better with sources".to_string(),
            },
        )]);
        let json = serde_json::to_value(&trained).unwrap();
        assert_eq!(json["Researcher"]["suggestions"][0], "Cite sources");
    }
}
