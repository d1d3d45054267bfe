use tracing::info;

use super::execution::{ExecutionPlan, TaskHook};
use super::{Crew, CrewError, CrewOutput};

impl Crew {
    /// Re-run the latest kickoff from the task with `task_id` on, reusing the
    /// logged inputs and the outputs of the tasks before it
    pub async fn replay(&mut self, task_id: &str) -> Result<CrewOutput, CrewError> {
        let stored = self.stored_task_outputs().await?;
        if stored.is_empty() {
            return Err(CrewError::Validation(
                "no task outputs were logged by a previous kickoff, run the crew before replaying".to_string(),
            ));
        }

        let row = stored
            .iter()
            .find(|row| row.task_id == task_id)
            .ok_or_else(|| CrewError::TaskNotFound(task_id.to_string()))?;
        let start_index = usize::try_from(row.task_index)
            .ok()
            .filter(|index| *index < self.tasks.len())
            .ok_or_else(|| CrewError::TaskNotFound(task_id.to_string()))?;

        // Tasks get fresh ids per process; reuse the logged ones
        for logged in &stored {
            if let Some(task) = usize::try_from(logged.task_index).ok().and_then(|i| self.tasks.get_mut(i)) {
                task.id = logged.task_id.clone();
            }
        }

        let inputs = row.inputs.clone();
        info!(task_id, start_index, "replaying crew");
        self.validate().await?;
        self.prepare(&inputs).await?;

        let previous_outputs = stored
            .iter()
            .filter(|logged| logged.task_index < row.task_index)
            .map(|logged| logged.output.clone())
            .collect();
        let plan = ExecutionPlan {
            start_index,
            previous_outputs,
            replayed: true,
        };
        self.execute_tasks(plan, &inputs, TaskHook::None).await
    }
}
