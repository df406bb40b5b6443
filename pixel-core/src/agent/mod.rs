//! The migration team's agents
//!
//! Three roles share one model resolver and one key rotation; each role owns
//! its prompts and knows how to read its model's replies.

mod prompts;
mod roles;
mod types;

pub use prompts::{
    get_template, render, system_prompt, PromptBuilder, PromptContext, PromptKind, SYSTEM_PROMPT,
};
pub use roles::{
    parse_patches, strip_code_fence, AnalyzerAgent, ArchitectAgent, DeveloperAgent, FilePatch,
    RoleAgent,
};
pub use types::Role;
