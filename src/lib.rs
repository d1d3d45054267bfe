pub mod agent;
pub mod config;
pub mod crew;
pub mod entrypoints;
pub mod llm;
pub mod project;
pub mod storage;
pub mod task;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_utils;

pub use agent::{Agent, AgentError, AgentModelConfig, AgentResponse};
pub use crew::{Crew, CrewError, CrewOutput, Process, TaskOutput};
pub use project::LatestAiDevelopment;
pub use task::{Inputs, Task};
