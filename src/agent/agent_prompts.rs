use crate::agent::agent::Agent;
use crate::llm::ChatMessage;
use crate::task::Task;

impl Agent {
    /// Build initial messages for the agent
    pub fn build_initial_messages(&self, task: &Task, context: Option<&str>) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.build_system_prompt()),
            ChatMessage::user(self.build_task_prompt(task, context)),
        ]
    }

    fn build_system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role.role, self.role.backstory, self.role.goal
        );

        if !self.tools.is_empty() {
            let names: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
            prompt.push_str(&format!(
                "\n\nYou can call the following tools when they help: {}. \
                 Once you have everything you need, answer directly without calling a tool.",
                names.join(", ")
            ));
        }

        prompt
    }

    fn build_task_prompt(&self, task: &Task, context: Option<&str>) -> String {
        let mut prompt = format!("Current Task: {}", task.description);

        prompt.push_str(&format!(
            "\n\nThis is the expected criteria for your final answer: {}\n\
             You MUST return the actual complete content as the final answer, not a summary.",
            task.expected_output
        ));

        prompt.push_str(&format!("\n\nIMPORTANT - Output Format: {}", task.output_format.get_format_prompt()));

        if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("\n\nThis is the context you're working with:\n{}", context));
        }

        if !self.trained_suggestions.is_empty() {
            prompt.push_str("\n\nYou MUST follow these instructions:");
            for suggestion in &self.trained_suggestions {
                prompt.push_str(&format!("\n - {}", suggestion));
            }
        }

        prompt.push_str("\n\nBegin! This is VERY important to you, give your best final answer.");
        prompt
    }
}
