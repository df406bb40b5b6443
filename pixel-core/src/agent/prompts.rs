//! Prompt templates for the migration team
//!
//! Templates are embedded markdown with `{{VARIABLE}}` placeholders.

use std::collections::HashMap;

use crate::agent::Role;

/// Team-wide system prompt
pub const SYSTEM_PROMPT: &str = include_str!("prompts/system.md");

const ANALYZE_PROMPT: &str = include_str!("prompts/analyze.md");
const PLAN_PROMPT: &str = include_str!("prompts/plan.md");
const CONVERT_PROMPT: &str = include_str!("prompts/convert.md");
const CREATE_PROMPT: &str = include_str!("prompts/create.md");
const FIX_PROMPT: &str = include_str!("prompts/fix.md");

/// Which task a prompt is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Analyze,
    Plan,
    Convert,
    Create,
    Fix,
}

impl PromptKind {
    /// Role that answers this prompt
    pub fn role(&self) -> Role {
        match self {
            PromptKind::Analyze => Role::Analyzer,
            PromptKind::Plan => Role::Architect,
            PromptKind::Convert | PromptKind::Create | PromptKind::Fix => Role::Developer,
        }
    }
}

/// Get the raw template for a prompt kind
pub fn get_template(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Analyze => ANALYZE_PROMPT,
        PromptKind::Plan => PLAN_PROMPT,
        PromptKind::Convert => CONVERT_PROMPT,
        PromptKind::Create => CREATE_PROMPT,
        PromptKind::Fix => FIX_PROMPT,
    }
}

/// System prompt for one role: the team prompt plus the role's job
pub fn system_prompt(team_prompt: Option<&str>, role: Role) -> String {
    format!(
        "{}\n\n## Your role\n\nYou are the {}. {}.",
        team_prompt.unwrap_or(SYSTEM_PROMPT).trim_end(),
        role.name(),
        role.description()
    )
}

/// Context for rendering a prompt template
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    variables: HashMap<String, String>,
}

impl PromptContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Set a variable value (builder pattern)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a bulleted file list
    pub fn with_files(self, files: &[String]) -> Self {
        let files_str = if files.is_empty() {
            "(no files)".to_string()
        } else {
            files
                .iter()
                .map(|f| format!("- `{}`", f))
                .collect::<Vec<_>>()
                .join("\n")
        };
        self.with("FILES", files_str)
    }
}

/// Render a prompt template with the given context
pub fn render(kind: PromptKind, context: &PromptContext) -> String {
    render_template(get_template(kind), context)
}

/// Substitute `{{NAME}}` placeholders in one pass
///
/// Substituted values are copied verbatim, so braces inside source code
/// (JSX style objects, Vue interpolation) are never touched. Unset
/// placeholders become `(not specified)`.
fn render_template(template: &str, context: &PromptContext) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let name_len = after
            .find("}}")
            .filter(|&end| {
                end > 0
                    && after[..end]
                        .chars()
                        .all(|c| c.is_ascii_uppercase() || c == '_')
            });

        match name_len {
            Some(end) => {
                let name = &after[..end];
                match context.variables.get(name) {
                    Some(value) => result.push_str(value),
                    None => result.push_str("(not specified)"),
                }
                rest = &after[end + 2..];
            }
            None => {
                result.push_str("{{");
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

/// Build a complete prompt for a task
pub struct PromptBuilder {
    kind: PromptKind,
    context: PromptContext,
}

impl PromptBuilder {
    /// Create a new prompt builder for the given kind
    pub fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            context: PromptContext::new(),
        }
    }

    /// Set the file list
    pub fn files(mut self, files: &[String]) -> Self {
        self.context = self.context.with_files(files);
        self
    }

    /// Set a custom variable
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context = self.context.with(key, value);
        self
    }

    /// Build the final prompt
    pub fn build(self) -> String {
        render(self.kind, &self.context)
    }
}
