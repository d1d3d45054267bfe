pub mod definitions;
pub mod settings;

pub use definitions::{AgentDefinition, CrewDefinitions, TaskDefinition};
pub use settings::Settings;
