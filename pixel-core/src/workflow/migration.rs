//! Migration state machine
//!
//! ANALYZE -> PLAN -> EXECUTE -> VALIDATE, then VALIDATE <-> FIX until the
//! check passes (DONE) or the fix budget runs out (GAVE_UP).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The current phase of a migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPhase {
    Analyze,
    Plan,
    Execute,
    Validate,
    Fix,
    Done,
    GaveUp,
}

impl MigrationPhase {
    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            MigrationPhase::Analyze => "Analyzing the Next.js project",
            MigrationPhase::Plan => "Planning the migration",
            MigrationPhase::Execute => "Writing Nuxt files",
            MigrationPhase::Validate => "Type-checking the output",
            MigrationPhase::Fix => "Fixing type errors",
            MigrationPhase::Done => "Migration complete",
            MigrationPhase::GaveUp => "Gave up after exhausting fix attempts",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MigrationPhase::Done | MigrationPhase::GaveUp)
    }
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A transition between phases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationTransition {
    pub from: MigrationPhase,
    pub to: MigrationPhase,
    pub message: Option<String>,
}

/// State tracking for one migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationState {
    pub phase: MigrationPhase,
    /// Fix rounds started so far
    pub fix_attempts: u32,
    pub max_fix_attempts: u32,
    pub history: Vec<MigrationTransition>,
}

impl MigrationState {
    pub fn new(max_fix_attempts: u32) -> Self {
        Self {
            phase: MigrationPhase::Analyze,
            fix_attempts: 0,
            max_fix_attempts,
            history: Vec::new(),
        }
    }

    fn transition(&mut self, to: MigrationPhase, message: Option<String>) {
        tracing::info!(from = ?self.phase, to = ?to, "Migration phase transition");
        self.history.push(MigrationTransition {
            from: self.phase,
            to,
            message,
        });
        self.phase = to;
    }

    /// Step along the linear part of the pipeline
    ///
    /// Returns the new phase, or `None` from VALIDATE, FIX and the terminal
    /// phases, which move through [`validation_passed`](Self::validation_passed),
    /// [`validation_failed`](Self::validation_failed) and
    /// [`fix_applied`](Self::fix_applied).
    pub fn advance(&mut self, message: Option<String>) -> Option<MigrationPhase> {
        let next = match self.phase {
            MigrationPhase::Analyze => MigrationPhase::Plan,
            MigrationPhase::Plan => MigrationPhase::Execute,
            MigrationPhase::Execute => MigrationPhase::Validate,
            _ => return None,
        };
        self.transition(next, message);
        Some(next)
    }

    /// VALIDATE succeeded, or validation is disabled
    pub fn validation_passed(&mut self) {
        self.transition(MigrationPhase::Done, None);
    }

    /// VALIDATE failed: go to FIX if the budget allows, else GAVE_UP
    pub fn validation_failed(&mut self, errors: &str) -> MigrationPhase {
        let summary = errors.lines().next().map(str::to_string);
        if self.exceeded_max_fix_attempts() {
            self.transition(MigrationPhase::GaveUp, summary);
        } else {
            self.fix_attempts += 1;
            self.transition(MigrationPhase::Fix, summary);
        }
        self.phase
    }

    /// FIX wrote its patches; check again
    pub fn fix_applied(&mut self, patched: usize) {
        self.transition(
            MigrationPhase::Validate,
            Some(format!("{} file(s) patched", patched)),
        );
    }

    pub fn exceeded_max_fix_attempts(&self) -> bool {
        self.fix_attempts >= self.max_fix_attempts
    }

    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }
}
