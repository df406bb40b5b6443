//! Role agents for the migration team
//!
//! Each agent pairs a [`Role`] with a resolved model and knows how to phrase
//! its task. Agents hold no conversation state; the team passes the session
//! history in on every call.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::agent::prompts::{system_prompt, PromptBuilder, PromptKind};
use crate::agent::Role;
use crate::knowledge::KnowledgeClient;
use crate::llm::{ChatMessage, ChatModel, ChatRequest};
use crate::plan::{json_values, parse_plan, FileMigration, MigrationAction, MigrationPlan};
use crate::project::ProjectInventory;
use crate::{Error, Result};

/// A model with a role-specific system prompt
#[derive(Debug, Clone)]
pub struct RoleAgent {
    role: Role,
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    max_tokens: u32,
}

impl RoleAgent {
    /// Create an agent; `team_prompt` replaces the built-in team prompt
    pub fn new(role: Role, model: Arc<dyn ChatModel>, team_prompt: Option<&str>) -> Self {
        Self {
            role,
            model,
            system_prompt: system_prompt(team_prompt, role),
            max_tokens: 8192,
        }
    }

    /// Set the completion token limit
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn model(&self) -> &Arc<dyn ChatModel> {
        &self.model
    }

    /// Send `prompt` after the system prompt and prior history
    #[instrument(skip_all, fields(role = %self.role, provider = %self.model.provider()))]
    pub async fn ask(&self, history: &[ChatMessage], prompt: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(prompt));

        debug!(history = history.len(), "Asking model");
        let request = ChatRequest::new(messages).with_max_tokens(self.max_tokens);
        self.model.complete(&request).await
    }
}

/// Inspects the source project
#[derive(Debug, Clone)]
pub struct AnalyzerAgent {
    inner: RoleAgent,
}

impl AnalyzerAgent {
    pub fn new(inner: RoleAgent) -> Self {
        Self { inner }
    }

    pub fn agent(&self) -> &RoleAgent {
        &self.inner
    }

    /// Free-text analysis of the project
    pub async fn analyze(
        &self,
        inventory: &ProjectInventory,
        history: &[ChatMessage],
    ) -> Result<String> {
        let prompt = PromptBuilder::new(PromptKind::Analyze)
            .var("PROJECT_SUMMARY", inventory.summary())
            .build();
        self.inner.ask(history, &prompt).await
    }
}

/// Produces the migration plan
#[derive(Debug, Clone)]
pub struct ArchitectAgent {
    inner: RoleAgent,
}

impl ArchitectAgent {
    pub fn new(inner: RoleAgent) -> Self {
        Self { inner }
    }

    pub fn agent(&self) -> &RoleAgent {
        &self.inner
    }

    /// Ask for a plan and parse the reply
    pub async fn plan(
        &self,
        analysis: &str,
        inventory: &ProjectInventory,
        history: &[ChatMessage],
    ) -> Result<MigrationPlan> {
        let prompt = PromptBuilder::new(PromptKind::Plan)
            .var("ANALYSIS", analysis)
            .files(&inventory.files)
            .build();
        let reply = self.inner.ask(history, &prompt).await?;
        parse_plan(&reply)
    }
}

/// One file rewritten during the fix loop
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilePatch {
    pub path: String,
    pub content: String,
}

/// Writes the Nuxt files
#[derive(Debug, Clone)]
pub struct DeveloperAgent {
    inner: RoleAgent,
    knowledge: Option<Arc<KnowledgeClient>>,
}

impl DeveloperAgent {
    pub fn new(inner: RoleAgent) -> Self {
        Self {
            inner,
            knowledge: None,
        }
    }

    /// Consult a knowledge tool before writing each file
    pub fn with_knowledge(mut self, knowledge: Arc<KnowledgeClient>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn agent(&self) -> &RoleAgent {
        &self.inner
    }

    pub fn has_knowledge(&self) -> bool {
        self.knowledge.is_some()
    }

    async fn reference(&self, entry: &FileMigration) -> Result<String> {
        let Some(knowledge) = &self.knowledge else {
            return Ok("(no reference available)".to_string());
        };
        let query = format!("{} {}", entry.description, entry.target_path);
        Ok(knowledge
            .lookup(query.trim())
            .await?
            .unwrap_or_else(|| "(no reference available)".to_string()))
    }

    /// Full contents for a `convert` or `create` entry
    ///
    /// `copy` entries never reach the model.
    pub async fn write_file(
        &self,
        entry: &FileMigration,
        source: Option<&str>,
        plan: &MigrationPlan,
        history: &[ChatMessage],
    ) -> Result<String> {
        let kind = match entry.action {
            MigrationAction::Convert => PromptKind::Convert,
            MigrationAction::Create => PromptKind::Create,
            MigrationAction::Copy => {
                return Err(Error::Plan(format!(
                    "{} is a copy entry and needs no model",
                    entry.target_path
                )))
            }
        };

        let config_changes = if plan.config_changes.is_empty() {
            "(none)".to_string()
        } else {
            plan.config_changes
                .iter()
                .map(|c| format!("- {}", c))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let prompt = PromptBuilder::new(kind)
            .var("PLAN_SUMMARY", plan.summary.as_str())
            .var("CONFIG_CHANGES", config_changes)
            .var("SOURCE_PATH", entry.source_path.as_str())
            .var("TARGET_PATH", entry.target_path.as_str())
            .var("DESCRIPTION", entry.description.as_str())
            .var("SOURCE", source.unwrap_or(""))
            .var("KNOWLEDGE", self.reference(entry).await?)
            .build();

        let reply = self.inner.ask(history, &prompt).await?;
        Ok(strip_code_fence(&reply))
    }

    /// Patches for a failed type check
    pub async fn fix(
        &self,
        errors: &str,
        files: &[String],
        attempt: u32,
        max_attempts: u32,
        history: &[ChatMessage],
    ) -> Result<Vec<FilePatch>> {
        let prompt = PromptBuilder::new(PromptKind::Fix)
            .var("ERRORS", errors)
            .var("ATTEMPT", attempt.to_string())
            .var("MAX_ATTEMPTS", max_attempts.to_string())
            .files(files)
            .build();

        let reply = self.inner.ask(history, &prompt).await?;
        parse_patches(&reply)
    }
}

/// Parse a `[{path, content}]` reply
pub fn parse_patches(reply: &str) -> Result<Vec<FilePatch>> {
    let json = json_values(reply)
        .find(|json| json.starts_with('['))
        .ok_or_else(|| Error::Plan("No JSON patch list found in fix reply".to_string()))?;
    serde_json::from_str(json)
        .map_err(|e| Error::Plan(format!("Fix reply is not a valid patch list: {}", e)))
}

const FENCE: &str = "```";

/// Body of the outer fenced block, or the whole reply when there is none
///
/// The block runs from the first fence to the last one, so fences nested in
/// the file (a markdown guide with a shell snippet) stay in the body.
pub fn strip_code_fence(reply: &str) -> String {
    let trimmed = reply.trim();
    if let Some(open) = trimmed.find(FENCE) {
        let after = &trimmed[open + FENCE.len()..];
        // skip the info string (e.g. "vue", "md")
        if let Some(newline) = after.find('\n') {
            let body = &after[newline + 1..];
            if let Some(close) = body.rfind(FENCE) {
                return body[..close].to_string();
            }
        }
    }

    let mut text = trimmed.to_string();
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use crate::llm::ChatRole;
    use tempfile::TempDir;

    fn project() -> (TempDir, ProjectInventory) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("app")).unwrap();
        std::fs::write(
            dir.path().join("app/page.tsx"),
            "export default () => <h1>Hi</h1>",
        )
        .unwrap();
        let inventory = ProjectInventory::scan(dir.path()).unwrap();
        (dir, inventory)
    }

    fn agent(role: Role, replies: &[&str]) -> (Arc<ScriptedModel>, RoleAgent) {
        let model = Arc::new(ScriptedModel::new(replies.iter().copied()));
        let agent = RoleAgent::new(role, model.clone(), None);
        (model, agent)
    }

    #[tokio::test]
    async fn test_ask_layout() {
        let (model, agent) = agent(Role::Analyzer, &["ok"]);
        let history = vec![ChatMessage::user("earlier"), ChatMessage::assistant("reply")];

        agent.ask(&history, "now").await.unwrap();

        let request = &model.requests()[0];
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert!(request.messages[0].content.contains("You are the analyzer"));
        assert_eq!(request.messages[3].content, "now");
    }

    #[tokio::test]
    async fn test_analyzer_sends_inventory() {
        let (_dir, inventory) = project();
        let (model, inner) = agent(Role::Analyzer, &["It is an App Router project"]);

        let analysis = AnalyzerAgent::new(inner).analyze(&inventory, &[]).await.unwrap();
        assert_eq!(analysis, "It is an App Router project");
        assert!(model.prompts()[0].contains("- app/page.tsx"));
    }

    #[tokio::test]
    async fn test_architect_parses_plan() {
        let (_dir, inventory) = project();
        let reply = r#"```json
{"project_name": "p", "summary": "s", "files_to_migrate": [
  {"source_path": "app/page.tsx", "target_path": "pages/index.vue", "action": "convert", "description": "home"}
], "config_changes": []}
```"#;
        let (model, inner) = agent(Role::Architect, &[reply]);

        let plan = ArchitectAgent::new(inner)
            .plan("analysis text", &inventory, &[])
            .await
            .unwrap();
        assert_eq!(plan.files_to_migrate.len(), 1);
        assert!(model.prompts()[0].contains("analysis text"));
    }

    #[tokio::test]
    async fn test_architect_bad_reply() {
        let (_dir, inventory) = project();
        let (_, inner) = agent(Role::Architect, &["no plan today"]);
        let err = ArchitectAgent::new(inner)
            .plan("a", &inventory, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Plan(_)));
    }

    #[tokio::test]
    async fn test_developer_strips_fence() {
        let (_, inner) = agent(
            Role::Developer,
            &["Here you go:\n```vue\n<template><h1>Hi</h1></template>\n```"],
        );
        let entry = FileMigration {
            source_path: "app/page.tsx".to_string(),
            target_path: "pages/index.vue".to_string(),
            action: MigrationAction::Convert,
            description: "home page".to_string(),
        };

        let content = DeveloperAgent::new(inner)
            .write_file(&entry, Some("src"), &MigrationPlan::default(), &[])
            .await
            .unwrap();
        assert_eq!(content, "<template><h1>Hi</h1></template>\n");
    }

    #[tokio::test]
    async fn test_developer_refuses_copy() {
        let (model, inner) = agent(Role::Developer, &[]);
        let entry = FileMigration {
            source_path: "a.png".to_string(),
            target_path: "public/a.png".to_string(),
            action: MigrationAction::Copy,
            description: String::new(),
        };
        assert!(DeveloperAgent::new(inner)
            .write_file(&entry, None, &MigrationPlan::default(), &[])
            .await
            .is_err());
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fix_returns_patches() {
        let (model, inner) = agent(
            Role::Developer,
            &[r#"[{"path": "pages/index.vue", "content": "<template/>"}]"#],
        );
        let patches = DeveloperAgent::new(inner)
            .fix("TS2304", &["pages/index.vue".to_string()], 1, 3, &[])
            .await
            .unwrap();
        assert_eq!(patches[0].path, "pages/index.vue");
        assert!(model.prompts()[0].contains("attempt 1 of 3"));
    }

    #[test]
    fn test_strip_code_fence_without_fence() {
        assert_eq!(strip_code_fence("  plain text  "), "plain text\n");
        assert_eq!(strip_code_fence("```vue\nunterminated"), "```vue\nunterminated\n");
    }

    #[test]
    fn test_strip_code_fence_keeps_nested_fences() {
        let reply = "```md\n# Guide\n\nRun:\n\n```bash\nnpm i\n```\n\nDone.\n```";
        assert_eq!(
            strip_code_fence(reply),
            "# Guide\n\nRun:\n\n```bash\nnpm i\n```\n\nDone.\n"
        );
    }

    #[test]
    fn test_parse_patches_skips_bracketed_prose() {
        let reply = r#"Fixed [TS2304] in one file:
[{"path": "a.vue", "content": "<template/>"}]"#;
        let patches = parse_patches(reply).unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].path, "a.vue");
    }
}
