//! GitHub API module
//!
//! Thin read-only wrapper over the GitHub REST API: user → repositories →
//! directories and files.

mod client;
mod types;

pub use client::{GithubClient, GithubError};
pub use types::{ContentEntry, ContentKind, ContentRoot, RepoDirectory, RepoFile, Repository};
