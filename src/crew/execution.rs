use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::evaluator::CrewEvaluator;
use super::training::{TrainedAgentSuggestions, TrainingSession};
use super::{Crew, CrewError, CrewOutput, Process, TaskOutput, UsageMetrics};
use crate::storage::JsonFileHandler;
use crate::task::Inputs;
use crate::tools::{delegation_tools, SharedAgent};

pub(crate) const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

const DELEGATION_TOOL_NAMES: [&str; 2] = ["delegate_work_to_coworker", "ask_question_to_coworker"];

/// Extra work done after each task of a kickoff
pub(crate) enum TaskHook<'a> {
    None,
    Training(&'a mut TrainingSession),
    Evaluation(&'a mut CrewEvaluator),
}

/// Where task execution starts and what it continues from
pub(crate) struct ExecutionPlan {
    pub start_index: usize,
    pub previous_outputs: Vec<TaskOutput>,
    pub replayed: bool,
}

impl Crew {
    /// Run every task with `inputs` interpolated into agents and tasks
    pub async fn kickoff(&mut self, inputs: Inputs) -> Result<CrewOutput, CrewError> {
        self.kickoff_with_hook(inputs, TaskHook::None).await
    }

    pub(crate) async fn kickoff_with_hook(
        &mut self,
        inputs: Inputs,
        hook: TaskHook<'_>,
    ) -> Result<CrewOutput, CrewError> {
        info!(process = ?self.process, tasks = self.tasks.len(), "crew kickoff");
        self.validate().await?;
        self.prepare(&inputs).await?;

        if let Some(storage) = &self.storage {
            storage.reset().await?;
        }

        let plan = ExecutionPlan {
            start_index: 0,
            previous_outputs: Vec::new(),
            replayed: false,
        };
        self.execute_tasks(plan, &inputs, hook).await
    }

    /// Interpolate inputs, apply trained suggestions and hand out delegation tools
    pub(crate) async fn prepare(&mut self, inputs: &Inputs) -> Result<(), CrewError> {
        if !inputs.is_empty() {
            self.interpolate_inputs(inputs).await?;
        }
        self.apply_trained_suggestions().await?;
        self.equip_delegation_tools().await;
        Ok(())
    }

    async fn interpolate_inputs(&mut self, inputs: &Inputs) -> Result<(), CrewError> {
        for agent in self.all_agents() {
            let mut agent = agent.lock().await;
            let role = agent.template().interpolate(inputs)?;
            agent.role = role;
        }
        for task in &mut self.tasks {
            task.interpolate_inputs(inputs)?;
        }
        debug!(inputs = ?inputs, "interpolated crew inputs");
        Ok(())
    }

    async fn apply_trained_suggestions(&self) -> Result<(), CrewError> {
        let Some(path) = &self.trained_agents_file else {
            return Ok(());
        };
        let handler = JsonFileHandler::new(path);
        if !handler.exists() {
            return Ok(());
        }

        let trained: TrainedAgentSuggestions = handler.load()?;
        for agent in self.all_agents() {
            let mut agent = agent.lock().await;
            let suggestions = trained
                .iter()
                .find(|(role, _)| agent.role.matches(role))
                .map(|(_, data)| data.suggestions.clone());
            if let Some(suggestions) = suggestions {
                debug!(agent = %agent.role.role, count = suggestions.len(), "applying trained suggestions");
                agent.trained_suggestions = suggestions;
            }
        }
        Ok(())
    }

    async fn equip_delegation_tools(&self) {
        match self.process {
            Process::Hierarchical => {
                if let Some(manager) = &self.manager {
                    let tools = delegation_tools(&self.agents).await;
                    replace_delegation_tools(manager, tools).await;
                }
            }
            Process::Sequential => {
                for agent in &self.agents {
                    if !agent.lock().await.allow_delegation {
                        continue;
                    }
                    let coworkers: Vec<SharedAgent> = self
                        .agents
                        .iter()
                        .filter(|other| !Arc::ptr_eq(*other, agent))
                        .cloned()
                        .collect();
                    if coworkers.is_empty() {
                        continue;
                    }
                    let tools = delegation_tools(&coworkers).await;
                    replace_delegation_tools(agent, tools).await;
                }
            }
        }
    }

    /// Crew agents followed by the manager, if any
    pub(crate) fn all_agents(&self) -> Vec<SharedAgent> {
        self.agents.iter().chain(self.manager.iter()).cloned().collect()
    }

    /// Execute tasks from `plan.start_index` on, logging each output
    pub(crate) async fn execute_tasks(
        &mut self,
        plan: ExecutionPlan,
        inputs: &Inputs,
        mut hook: TaskHook<'_>,
    ) -> Result<CrewOutput, CrewError> {
        let ExecutionPlan {
            start_index,
            mut previous_outputs,
            replayed,
        } = plan;
        let mut usage = UsageMetrics::default();

        for index in start_index..self.tasks.len() {
            let task = self.tasks[index].clone();
            let agent = self.executing_agent(&task).await?;
            let context = build_context(&previous_outputs);

            let (response, role) = {
                let mut agent = agent.lock().await;
                info!(task = %task.summary(), agent = %agent.role.role, index, "executing task");
                let response = agent.execute_task(&task, context.as_deref()).await?;
                (response, agent.role.role.clone())
            };
            usage.add_response(&response);

            let mut output = TaskOutput::new(&task, role, response.content.clone());
            match &mut hook {
                TaskHook::None => {}
                TaskHook::Training(session) => {
                    output = session
                        .review(self.feedback.as_ref(), &agent, &task, context.as_deref(), output, &mut usage)
                        .await?;
                }
                TaskHook::Evaluation(evaluator) => {
                    evaluator.evaluate(index, &task, &output, response.execution_time_ms).await?;
                }
            }

            if let Some(output_file) = &task.output_file {
                write_output_file(Path::new(output_file), &output.raw)?;
            }
            if let Some(storage) = &self.storage {
                storage.upsert(index, &output, inputs, replayed).await?;
            }
            previous_outputs.push(output);
        }

        self.usage_metrics.add(&usage);
        info!(
            total_tokens = usage.total_tokens,
            requests = usage.successful_requests,
            "crew finished"
        );
        Ok(CrewOutput::new(previous_outputs, usage))
    }
}

async fn replace_delegation_tools(agent: &SharedAgent, tools: Vec<Arc<dyn crate::tools::Tool>>) {
    let mut agent = agent.lock().await;
    agent.tools.retain(|tool| !DELEGATION_TOOL_NAMES.contains(&tool.name()));
    agent.tools.extend(tools);
}

/// Raw outputs of earlier tasks, or `None` before the first task
pub(crate) fn build_context(previous_outputs: &[TaskOutput]) -> Option<String> {
    if previous_outputs.is_empty() {
        return None;
    }
    let raws: Vec<&str> = previous_outputs.iter().map(|o| o.raw.as_str()).collect();
    Some(raws.join(CONTEXT_SEPARATOR))
}

fn write_output_file(path: &Path, content: &str) -> Result<(), CrewError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    info!(path = %path.display(), "wrote task output file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn output(raw: &str) -> TaskOutput {
        TaskOutput::new(&Task::new("d".to_string(), "e".to_string()), "agent", raw.to_string())
    }

    #[test]
    fn test_context_joins_previous_outputs() {
        assert_eq!(build_context(&[]), None);
        assert_eq!(build_context(&[output("one")]).as_deref(), Some("one"));
        assert_eq!(
            build_context(&[output("one"), output("two")]).unwrap(),
            "one\n\n----------\n\ntwo"
        );
    }

    #[test]
    fn test_write_output_file_creates_parents() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out/report.md");
        write_output_file(&path, "# Report").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# Report");
    }
}
