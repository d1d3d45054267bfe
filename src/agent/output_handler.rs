use crate::task::OutputFormat;

/// Output Handler for output clean-up and validation
#[derive(Debug, Clone, Default)]
pub struct OutputHandler;

impl OutputHandler {
    pub fn new() -> Self {
        Self
    }

    /// Clean up raw model output and validate it against the task's format
    pub fn process_output(&self, raw_output: &str, format: &OutputFormat) -> Result<String, String> {
        let processed_output = match format {
            OutputFormat::Json { .. } => strip_code_fences(raw_output),
            OutputFormat::Text | OutputFormat::Markdown => raw_output.trim().to_string(),
        };

        format.validate(&processed_output).map_err(|e| e.to_string())?;

        Ok(processed_output)
    }
}


/// Extract the body of a ```json / ``` fenced block, or return the trimmed input
pub fn strip_code_fences(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() > 2 {
            return lines[1..lines.len() - 1].join("\n");
        }
    }
    trimmed.to_string()
}
