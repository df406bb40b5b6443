//! Tools the role agents act through

pub mod files;
pub mod shell;

pub use files::{copy_file, resolve_within, write_file};
pub use shell::{run_shell_command, ShellOutcome};
