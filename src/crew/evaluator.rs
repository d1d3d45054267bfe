use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use super::execution::TaskHook;
use super::{Crew, CrewError, TaskOutput};
use crate::agent::{Agent, AgentRole};
use crate::task::{Inputs, JsonFieldType, Task};

#[derive(Deserialize)]
struct TaskScore {
    quality: f64,
}

/// Scores every task output of a test run with a dedicated evaluator agent
pub struct CrewEvaluator {
    agent: Agent,
    iterations: usize,
    scores: BTreeMap<usize, Vec<f64>>,
    execution_times_ms: BTreeMap<usize, Vec<u64>>,
    agents: BTreeMap<usize, String>,
}

impl CrewEvaluator {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            iterations: 0,
            scores: BTreeMap::new(),
            execution_times_ms: BTreeMap::new(),
            agents: BTreeMap::new(),
        }
    }

    pub fn role() -> AgentRole {
        AgentRole::new(
            "Task Execution Evaluator".to_string(),
            "Your goal is to evaluate the performance of the agents in the crew based on the tasks they have \
             performed using score from 1 to 10 evaluating on completion, quality, and overall performance."
                .to_string(),
            "Evaluator agent for crew evaluation with precise capabilities to evaluate the performance of the \
             agents in the crew based on the tasks they have performed"
                .to_string(),
        )
    }

    pub fn start_iteration(&mut self) {
        self.iterations += 1;
    }

    /// Score one task output and record it with the task's execution time
    pub async fn evaluate(
        &mut self,
        task_index: usize,
        task: &Task,
        output: &TaskOutput,
        execution_time_ms: u64,
    ) -> Result<f64, CrewError> {
        let evaluation_task = Task::new_simple_json(
            format!(
                "Based on the task description and the expected output, compare and evaluate the performance of \
                 the agents in the crew based on the Task Output they have performed using score from 1 to 10 \
                 evaluating on completion, quality, and overall performance.\n\
                 task_description: {}\ntask_expected_output: {}\nagent: {}\nTask Output: {}",
                task.description, task.expected_output, output.agent, output.raw
            ),
            "Evaluation Score from 1 to 10 based on the performance of the agents on the tasks".to_string(),
            vec![("quality".to_string(), JsonFieldType::Number)],
            true,
        );

        let response = self.agent.execute_task(&evaluation_task, None).await?;
        let score: TaskScore = serde_json::from_str(&response.content)?;
        debug!(task_index, quality = score.quality, "task scored");

        self.scores.entry(task_index).or_default().push(score.quality);
        self.execution_times_ms.entry(task_index).or_default().push(execution_time_ms);
        self.agents.insert(task_index, output.agent.clone());
        Ok(score.quality)
    }

    pub fn report(&self) -> EvaluationReport {
        let tasks: Vec<TaskEvaluation> = self
            .scores
            .iter()
            .map(|(index, scores)| TaskEvaluation {
                task_index: *index,
                agent: self.agents.get(index).cloned().unwrap_or_default(),
                scores: scores.clone(),
                average: average(scores),
                execution_times_ms: self.execution_times_ms.get(index).cloned().unwrap_or_default(),
            })
            .collect();

        let crew_scores: Vec<f64> = (0..self.iterations)
            .map(|run| {
                let run_scores: Vec<f64> = tasks.iter().filter_map(|t| t.scores.get(run).copied()).collect();
                average(&run_scores)
            })
            .collect();

        let execution_times_ms: Vec<u64> = (0..self.iterations)
            .map(|run| tasks.iter().filter_map(|t| t.execution_times_ms.get(run)).sum())
            .collect();

        EvaluationReport {
            iterations: self.iterations,
            crew_average: average(&crew_scores),
            crew_scores,
            execution_times_ms,
            tasks,
        }
    }
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Scores of one task across test runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskEvaluation {
    pub task_index: usize,
    pub agent: String,
    pub scores: Vec<f64>,
    pub average: f64,
    pub execution_times_ms: Vec<u64>,
}

/// Result of `Crew::test`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub iterations: usize,
    pub tasks: Vec<TaskEvaluation>,
    /// Average task score per run
    pub crew_scores: Vec<f64>,
    pub crew_average: f64,
    /// Summed task execution time per run
    pub execution_times_ms: Vec<u64>,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = vec!["Tasks/Crew".to_string()];
        header.extend((1..=self.iterations).map(|run| format!("Run {}", run)));
        header.push("Avg. Total".to_string());
        header.push("Agents".to_string());

        let mut rows = vec![header];
        for task in &self.tasks {
            let mut row = vec![format!("Task {}", task.task_index + 1)];
            row.extend(task.scores.iter().map(|s| format!("{:.1}", s)));
            row.push(format!("{:.1}", task.average));
            row.push(task.agent.clone());
            rows.push(row);
        }

        let mut crew = vec!["Crew".to_string()];
        crew.extend(self.crew_scores.iter().map(|s| format!("{:.1}", s)));
        crew.push(format!("{:.1}", self.crew_average));
        crew.push(String::new());
        rows.push(crew);

        let seconds: Vec<f64> = self.execution_times_ms.iter().map(|ms| *ms as f64 / 1000.0).collect();
        let mut times = vec!["Execution Time (s)".to_string()];
        times.extend(seconds.iter().map(|s| format!("{:.0}", s)));
        times.push(format!("{:.0}", average(&seconds)));
        times.push(String::new());
        rows.push(times);

        let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let widths: Vec<usize> = (0..columns)
            .map(|c| rows.iter().filter_map(|r| r.get(c)).map(|cell| cell.chars().count()).max().unwrap_or(0))
            .collect();

        writeln!(f, "Tasks Scores (1-10 Higher is better)")?;
        for (i, row) in rows.iter().enumerate() {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(c, width)| format!("{:<width$}", row.get(c).map(String::as_str).unwrap_or(""), width = width))
                .collect();
            writeln!(f, "| {} |", cells.join(" | "))?;
            if i == 0 {
                let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
                writeln!(f, "|-{}-|", rule.join("-|-"))?;
            }
        }
        Ok(())
    }
}

impl Crew {
    /// Run `n_iterations` kickoffs and score every task output with `eval_llm`
    pub async fn test(
        &mut self,
        n_iterations: u32,
        eval_llm: &str,
        inputs: Inputs,
    ) -> Result<EvaluationReport, CrewError> {
        if n_iterations == 0 {
            return Err(CrewError::Validation(
                "the number of test iterations must be a positive integer".to_string(),
            ));
        }

        let mut evaluator = CrewEvaluator::new(self.evaluator_agent(eval_llm, CrewEvaluator::role())?);
        for iteration in 0..n_iterations {
            info!(iteration, n_iterations, eval_llm, "test iteration");
            evaluator.start_iteration();
            self.kickoff_with_hook(inputs.clone(), TaskHook::Evaluation(&mut evaluator)).await?;
        }

        let report = evaluator.report();
        info!(crew_average = report.crew_average, "crew evaluated");
        Ok(report)
    }
}
