//! Git operations for Pixel-Perfect
//!
//! Remote Next.js projects are cloned into a local cache before analysis.

mod clone;

pub use clone::{
    clone_repo, default_clones_dir, fetch_repo, is_remote, repo_name_from_url, RepoSource,
};
