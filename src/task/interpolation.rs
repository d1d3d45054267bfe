use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Named kickoff inputs, e.g. `topic` and `current_year`
pub type Inputs = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolationError {
    #[error("Template variable '{0}' not found in inputs")]
    MissingVariable(String),
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_\-]*)\}").expect("placeholder pattern is valid")
    })
}

/// Replace every `{name}` placeholder with its input value.
///
/// Braces that do not enclose an identifier (JSON snippets, empty `{}`)
/// are left untouched.
pub fn interpolate(template: &str, inputs: &Inputs) -> Result<String, InterpolationError> {
    let pattern = placeholder_pattern();
    let mut result = String::with_capacity(template.len());
    let mut last = 0;

    for captures in pattern.captures_iter(template) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let value = inputs
            .get(name.as_str())
            .ok_or_else(|| InterpolationError::MissingVariable(name.as_str().to_string()))?;
        result.push_str(&template[last..whole.start()]);
        result.push_str(value);
        last = whole.end();
    }

    result.push_str(&template[last..]);
    Ok(result)
}

pub fn interpolate_opt(template: Option<&str>, inputs: &Inputs) -> Result<Option<String>, InterpolationError> {
    template.map(|t| interpolate(t, inputs)).transpose()
}
