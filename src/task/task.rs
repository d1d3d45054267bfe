use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashSet;

use super::interpolation::{interpolate, interpolate_opt, Inputs, InterpolationError};

// Enum to define different output format types
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum OutputFormat {
    Text,     // Free-form text output
    Markdown, // Report-style output written to .md files
    Json {
        schema: JsonSchema,
        strict: bool, // Whether to enforce strict validation (no extra fields)
    },
}

// JSON Schema definition for validation
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JsonSchema {
    pub required_fields: Vec<JsonField>,
    pub optional_fields: Vec<JsonField>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JsonField {
    pub name: String,
    pub field_type: JsonFieldType,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum JsonFieldType {
    String,
    Number,
    Boolean,
    Array(Box<JsonFieldType>), // Array of specific type
    Object,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json { .. })
    }

    // Validate agent output against the expected format
    pub fn validate(&self, output: &str) -> Result<()> {
        match self {
            OutputFormat::Text | OutputFormat::Markdown => {
                if output.trim().is_empty() {
                    return Err(anyhow!("Output is empty"));
                }
                Ok(())
            }
            OutputFormat::Json { schema, strict } => validate_json_output(output, schema, *strict),
        }
    }

    // Generate a prompt section describing the expected output format
    pub fn get_format_prompt(&self) -> String {
        match self {
            OutputFormat::Text => "Provide your response as plain text.".to_string(),
            OutputFormat::Markdown => {
                "Provide your response in Markdown format, without wrapping it in ``` code fences.".to_string()
            }
            OutputFormat::Json { schema, strict } => {
                let mut prompt = "You must respond with valid JSON in the following format:\n\n{\n".to_string();

                for field in &schema.required_fields {
                    prompt.push_str(&format!(
                        "  \"{}\": <{}>,  // REQUIRED{}\n",
                        field.name,
                        type_to_string(&field.field_type),
                        field.description.as_ref().map(|d| format!(" - {}", d)).unwrap_or_default()
                    ));
                }
                for field in &schema.optional_fields {
                    prompt.push_str(&format!(
                        "  \"{}\": <{}>,  // OPTIONAL{}\n",
                        field.name,
                        type_to_string(&field.field_type),
                        field.description.as_ref().map(|d| format!(" - {}", d)).unwrap_or_default()
                    ));
                }

                prompt.push_str("}\n\n");
                if *strict {
                    prompt.push_str("IMPORTANT: Only include the specified fields. No additional fields are allowed.\n");
                }
                prompt.push_str("Ensure your response is valid JSON and follows this exact structure.");
                prompt
            }
        }
    }
}

fn validate_json_output(output: &str, schema: &JsonSchema, strict: bool) -> Result<()> {
    let parsed: Value =
        serde_json::from_str(output.trim()).map_err(|e| anyhow!("Output is not valid JSON: {}", e))?;

    let obj = parsed
        .as_object()
        .ok_or_else(|| anyhow!("JSON output must be an object, got: {}", parsed))?;

    for field in &schema.required_fields {
        let value = obj
            .get(&field.name)
            .ok_or_else(|| anyhow!("Missing required field: '{}'", field.name))?;
        validate_field_type(value, &field.field_type, &field.name)?;
    }

    for field in &schema.optional_fields {
        if let Some(value) = obj.get(&field.name) {
            validate_field_type(value, &field.field_type, &field.name)?;
        }
    }

    if strict {
        let expected_fields: HashSet<&String> = schema
            .required_fields
            .iter()
            .chain(schema.optional_fields.iter())
            .map(|f| &f.name)
            .collect();

        if let Some(key) = obj.keys().find(|key| !expected_fields.contains(key)) {
            return Err(anyhow!("Unexpected field in strict mode: '{}'", key));
        }
    }

    Ok(())
}

fn validate_field_type(value: &Value, expected_type: &JsonFieldType, field_name: &str) -> Result<()> {
    match expected_type {
        JsonFieldType::String if !value.is_string() => {
            Err(anyhow!("Field '{}' must be a string, got: {}", field_name, value))
        }
        JsonFieldType::Number if !value.is_number() => {
            Err(anyhow!("Field '{}' must be a number, got: {}", field_name, value))
        }
        JsonFieldType::Boolean if !value.is_boolean() => {
            Err(anyhow!("Field '{}' must be a boolean, got: {}", field_name, value))
        }
        JsonFieldType::Array(element_type) => {
            let arr = value
                .as_array()
                .ok_or_else(|| anyhow!("Field '{}' must be an array, got: {}", field_name, value))?;
            for (i, element) in arr.iter().enumerate() {
                validate_field_type(element, element_type, &format!("{}[{}]", field_name, i))?;
            }
            Ok(())
        }
        JsonFieldType::Object if !value.is_object() => {
            Err(anyhow!("Field '{}' must be an object, got: {}", field_name, value))
        }
        _ => Ok(()),
    }
}

fn type_to_string(field_type: &JsonFieldType) -> String {
    match field_type {
        JsonFieldType::String => "string".to_string(),
        JsonFieldType::Number => "number".to_string(),
        JsonFieldType::Boolean => "boolean".to_string(),
        JsonFieldType::Array(element_type) => format!("array of {}", type_to_string(element_type)),
        JsonFieldType::Object => "object".to_string(),
    }
}

/// Uninterpolated text of a task, kept so inputs can be re-applied
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq)]
pub struct TaskTemplate {
    pub description: String,
    pub expected_output: String,
    pub output_file: Option<String>,
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
pub struct Task {
    pub id: String,
    /// Definition key, e.g. `research_task`
    pub name: Option<String>,
    pub description: String,
    pub expected_output: String,
    pub output_file: Option<String>,
    /// Role or definition key of the agent assigned in sequential crews
    pub agent: Option<String>,
    pub output_format: OutputFormat,
    template: TaskTemplate,
}

impl Task {
    pub fn new(description: String, expected_output: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: None,
            template: TaskTemplate {
                description: description.clone(),
                expected_output: expected_output.clone(),
                output_file: None,
            },
            description,
            expected_output,
            output_file: None,
            agent: None,
            output_format: OutputFormat::Text,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_output_file(mut self, output_file: impl Into<String>) -> Self {
        let output_file = output_file.into();
        self.template.output_file = Some(output_file.clone());
        self.output_file = Some(output_file);
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    // Helper to create a simple JSON task with just field names and types
    pub fn new_simple_json(
        description: String,
        expected_output: String,
        required_fields: Vec<(String, JsonFieldType)>,
        strict: bool,
    ) -> Self {
        let fields = required_fields
            .into_iter()
            .map(|(name, field_type)| JsonField {
                name,
                field_type,
                description: None,
            })
            .collect();

        Self::new(description, expected_output).with_output_format(OutputFormat::Json {
            schema: JsonSchema {
                required_fields: fields,
                optional_fields: vec![],
            },
            strict,
        })
    }

    pub fn template(&self) -> &TaskTemplate {
        &self.template
    }

    /// Re-render description, expected output and output file from the templates
    pub fn interpolate_inputs(&mut self, inputs: &Inputs) -> Result<(), InterpolationError> {
        self.description = interpolate(&self.template.description, inputs)?;
        self.expected_output = interpolate(&self.template.expected_output, inputs)?;
        self.output_file = interpolate_opt(self.template.output_file.as_deref(), inputs)?;
        Ok(())
    }

    /// First ten words of the description, used in logs and stored outputs
    pub fn summary(&self) -> String {
        let words: Vec<&str> = self.description.split_whitespace().take(10).collect();
        format!("{}...", words.join(" "))
    }
}
