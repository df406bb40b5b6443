//! The migration team
//!
//! [`MigrationTeam`] wires the analyzer, architect and developer to their
//! models and a shared session transcript, then drives a run through
//! [`MigrationState`].

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::agent::{AnalyzerAgent, ArchitectAgent, DeveloperAgent, Role, RoleAgent};
use crate::config::ConfigStore;
use crate::knowledge::KnowledgeClient;
use crate::llm::{ChatMessage, ModelResolver};
use crate::plan::{MigrationAction, MigrationPlan, RejectedEntry};
use crate::project::ProjectInventory;
use crate::settings::{Settings, WorkflowSettings};
use crate::tools::{copy_file, run_shell_command, write_file};
use crate::workflow::history::{to_messages, Transcript, USER_ROLE};
use crate::workflow::migration::{MigrationPhase, MigrationState};
use crate::{Error, Result};

/// What a migration run produced
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub session_id: String,
    pub plan: MigrationPlan,
    pub rejected: Vec<RejectedEntry>,
    /// Target paths written, in order
    pub written: Vec<String>,
    /// `Done` or `GaveUp`
    pub outcome: MigrationPhase,
    pub fix_attempts: u32,
    /// Checker output from the last failed validation
    pub last_errors: Option<String>,
}

impl MigrationReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == MigrationPhase::Done
    }
}

/// Three role agents sharing one session
#[derive(Debug)]
pub struct MigrationTeam {
    analyzer: AnalyzerAgent,
    architect: ArchitectAgent,
    developer: DeveloperAgent,
    transcript: Arc<dyn Transcript>,
    history_window: usize,
}

impl MigrationTeam {
    /// Build the team against the session store
    ///
    /// A missing `session_id` starts a new session with a generated id; an
    /// existing one resumes its history.
    pub async fn build(
        store: &ConfigStore,
        settings: &Settings,
        session_id: Option<String>,
    ) -> Result<Self> {
        let transcript = open_transcript(settings, session_id).await?;
        Self::build_with_transcript(store, settings, transcript, None)
    }

    /// Build the team with a knowledge tool attached to the developer
    ///
    /// The client is returned alongside the team; the caller must close it.
    /// It is already closed when building fails.
    pub async fn build_with_knowledge(
        store: &ConfigStore,
        settings: &Settings,
        session_id: Option<String>,
    ) -> Result<(Self, Arc<KnowledgeClient>)> {
        let knowledge = Arc::new(
            KnowledgeClient::connect(&settings.knowledge.url, settings.knowledge.timeout).await?,
        );

        let built = match open_transcript(settings, session_id).await {
            Ok(transcript) => {
                Self::build_with_transcript(store, settings, transcript, Some(knowledge.clone()))
            }
            Err(e) => Err(e),
        };

        match built {
            Ok(team) => Ok((team, knowledge)),
            Err(e) => {
                if let Err(close_err) = knowledge.close().await {
                    warn!(error = %close_err, "Failed to close knowledge tool");
                }
                Err(e)
            }
        }
    }

    /// Resolve one model per role from a single shared key rotation
    pub fn build_with_transcript(
        store: &ConfigStore,
        settings: &Settings,
        transcript: Arc<dyn Transcript>,
        knowledge: Option<Arc<KnowledgeClient>>,
    ) -> Result<Self> {
        let resolver = ModelResolver::new(store.clone(), settings.llm.clone());
        let mut rotation = resolver.rotation()?;
        let team_prompt = settings.system_prompt_override()?;

        let mut agents = Vec::with_capacity(3);
        for role in Role::all() {
            let resolved = resolver.resolve_with(&mut rotation)?;
            info!(
                role = %role,
                provider = %resolved.provider,
                model = %resolved.model_id,
                fallback = resolved.resolution.is_fallback(),
                "Resolved model"
            );
            agents.push(
                RoleAgent::new(*role, resolved.model, team_prompt.as_deref())
                    .with_max_tokens(settings.llm.max_tokens),
            );
        }

        let mut agents = agents.into_iter();
        let (Some(analyzer), Some(architect), Some(developer)) =
            (agents.next(), agents.next(), agents.next())
        else {
            return Err(Error::Other("team needs three roles".to_string()));
        };

        let mut developer = DeveloperAgent::new(developer);
        if let Some(knowledge) = knowledge {
            developer = developer.with_knowledge(knowledge);
        }

        Ok(Self {
            analyzer: AnalyzerAgent::new(analyzer),
            architect: ArchitectAgent::new(architect),
            developer,
            transcript,
            history_window: settings.session.history_window,
        })
    }

    /// Assemble a team from prepared agents
    pub fn from_parts(
        analyzer: AnalyzerAgent,
        architect: ArchitectAgent,
        developer: DeveloperAgent,
        transcript: Arc<dyn Transcript>,
        history_window: usize,
    ) -> Self {
        Self {
            analyzer,
            architect,
            developer,
            transcript,
            history_window,
        }
    }

    pub fn session_id(&self) -> &str {
        self.transcript.session_id()
    }

    pub fn has_knowledge(&self) -> bool {
        self.developer.has_knowledge()
    }

    async fn history(&self) -> Result<Vec<ChatMessage>> {
        let turns = self.transcript.recent(self.history_window).await?;
        Ok(to_messages(&turns))
    }

    async fn record_exchange(&self, task: &str, role: Role, reply: &str) -> Result<()> {
        self.transcript.record(USER_ROLE, task).await?;
        self.transcript.record(role.name(), reply).await
    }

    /// Run only the analyzer
    #[instrument(skip_all, fields(session_id = %self.session_id()))]
    pub async fn analyze(&self, inventory: &ProjectInventory) -> Result<String> {
        let history = self.history().await?;
        let analysis = self.analyzer.analyze(inventory, &history).await?;

        let task = format!("Analyze the Next.js project at {}", inventory.root.display());
        self.record_exchange(&task, Role::Analyzer, &analysis).await?;
        Ok(analysis)
    }

    /// Run [`migrate`](Self::migrate), then close `knowledge` whatever the outcome
    pub async fn migrate_and_close(
        &self,
        knowledge: &KnowledgeClient,
        inventory: &ProjectInventory,
        output_dir: &Path,
        workflow: &WorkflowSettings,
    ) -> Result<MigrationReport> {
        let result = self.migrate(inventory, output_dir, workflow).await;
        if let Err(e) = knowledge.close().await {
            warn!(error = %e, "Failed to close knowledge tool");
        }
        result
    }

    /// Run the whole pipeline into `output_dir`
    #[instrument(skip_all, fields(session_id = %self.session_id(), output = %output_dir.display()))]
    pub async fn migrate(
        &self,
        inventory: &ProjectInventory,
        output_dir: &Path,
        workflow: &WorkflowSettings,
    ) -> Result<MigrationReport> {
        let mut state = MigrationState::new(workflow.max_fix_attempts);

        let analysis = self.analyze(inventory).await?;
        state.advance(None);

        let history = self.history().await?;
        let plan = self.architect.plan(&analysis, inventory, &history).await?;
        self.record_exchange(
            "Produce the migration plan",
            Role::Architect,
            &serde_json::to_string_pretty(&plan)?,
        )
        .await?;

        let (accepted, rejected) = plan.validate(inventory);
        info!(
            accepted = accepted.len(),
            rejected = rejected.len(),
            "Validated migration plan"
        );
        state.advance(Some(format!("{} file(s) planned", accepted.len())));

        if let Some(command) = workflow
            .scaffold_command
            .as_deref()
            .filter(|c| !c.trim().is_empty())
        {
            let outcome = run_shell_command(command, output_dir, workflow.command_timeout).await;
            if !outcome.success {
                warn!(command, error = %outcome.error_text(), "Scaffold command failed");
            }
        }

        let mut written = Vec::new();
        for entry in &accepted {
            match entry.action {
                MigrationAction::Copy => {
                    copy_file(
                        &inventory.root,
                        &entry.source_path,
                        output_dir,
                        &entry.target_path,
                    )?;
                }
                MigrationAction::Convert | MigrationAction::Create => {
                    let source = match entry.action {
                        MigrationAction::Convert => Some(inventory.read(&entry.source_path)?),
                        _ => None,
                    };
                    let history = self.history().await?;
                    let content = self
                        .developer
                        .write_file(entry, source.as_deref(), &plan, &history)
                        .await?;
                    write_file(output_dir, &entry.target_path, &content)?;

                    let task = format!(
                        "{} {} -> {}",
                        entry.action, entry.source_path, entry.target_path
                    );
                    self.record_exchange(task.trim(), Role::Developer, &content)
                        .await?;
                }
            }
            written.push(entry.target_path.clone());
        }
        state.advance(Some(format!("{} file(s) written", written.len())));

        let last_errors = self
            .validate_and_fix(&mut state, output_dir, workflow, &mut written)
            .await?;

        if state.phase == MigrationPhase::GaveUp {
            warn!(attempts = state.fix_attempts, "Migration gave up with type errors");
        } else {
            info!(files = written.len(), "Migration complete");
        }

        Ok(MigrationReport {
            session_id: self.session_id().to_string(),
            plan,
            rejected,
            written,
            outcome: state.phase,
            fix_attempts: state.fix_attempts,
            last_errors,
        })
    }

    /// VALIDATE <-> FIX until done or out of attempts
    async fn validate_and_fix(
        &self,
        state: &mut MigrationState,
        output_dir: &Path,
        workflow: &WorkflowSettings,
        written: &mut Vec<String>,
    ) -> Result<Option<String>> {
        let command = workflow.validate_command.trim();
        if command.is_empty() {
            state.validation_passed();
            return Ok(None);
        }

        loop {
            let outcome = run_shell_command(command, output_dir, workflow.command_timeout).await;
            if outcome.success {
                state.validation_passed();
                return Ok(None);
            }

            let errors = outcome.tool_text();
            if state.validation_failed(&errors) == MigrationPhase::GaveUp {
                return Ok(Some(errors));
            }

            let history = self.history().await?;
            let patches = match self
                .developer
                .fix(&errors, written, state.fix_attempts, state.max_fix_attempts, &history)
                .await
            {
                Ok(patches) => patches,
                Err(Error::Plan(message)) => {
                    warn!(%message, "Unusable fix reply");
                    Vec::new()
                }
                Err(e) => return Err(e),
            };

            let mut applied = Vec::new();
            for patch in &patches {
                match write_file(output_dir, &patch.path, &patch.content) {
                    Ok(_) => applied.push(patch.path.clone()),
                    Err(e) => warn!(path = %patch.path, error = %e, "Skipped patch"),
                }
            }
            for path in &applied {
                if !written.contains(path) {
                    written.push(path.clone());
                }
            }

            let task = format!(
                "Fix attempt {}: {}",
                state.fix_attempts,
                errors.lines().next().unwrap_or("")
            );
            self.record_exchange(
                &task,
                Role::Developer,
                &format!("Patched {}", applied.join(", ")),
            )
            .await?;
            state.fix_applied(applied.len());
        }
    }
}

#[cfg(feature = "database")]
async fn open_transcript(
    settings: &Settings,
    session_id: Option<String>,
) -> Result<Arc<dyn Transcript>> {
    use crate::workflow::history::DbTranscript;

    let path = settings
        .session
        .resolved_db_path()
        .ok_or_else(|| Error::Config("Could not determine session database path".to_string()))?;
    let db = pixel_db::Database::new(path).await?;
    let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    Ok(Arc::new(DbTranscript::open(db, &session_id).await?))
}

#[cfg(not(feature = "database"))]
async fn open_transcript(
    _settings: &Settings,
    session_id: Option<String>,
) -> Result<Arc<dyn Transcript>> {
    let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    warn!(%session_id, "Built without session database; history will not persist");
    Ok(Arc::new(crate::workflow::history::MemoryTranscript::new(session_id)))
}
