//! GitHub API types
//!
//! Records returned by the read-only repository browsing endpoints.

use serde::{Deserialize, Serialize};

/// Repository owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub full_name: String,
}

/// Directory inside a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDirectory {
    pub owner: String,
    pub repo: String,
    pub name: String,
    /// Path from the repository root
    pub path: String,
}

/// File inside a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFile {
    pub name: String,
    pub path: String,
    pub download_url: Option<String>,
}

/// Kind of an entry in a contents listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// Raw entry of `GET /repos/{owner}/{repo}/contents/{path}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl From<ContentEntry> for RepoFile {
    fn from(entry: ContentEntry) -> Self {
        Self {
            name: entry.name,
            path: entry.path,
            download_url: entry.download_url,
        }
    }
}

/// Repository payload as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RepositoryPayload {
    pub name: String,
    pub full_name: String,
}

/// Something whose contents can be listed: a repository or a directory in it
pub trait ContentRoot {
    fn owner(&self) -> &str;
    fn repo(&self) -> &str;
    /// Path of the root inside the repository; empty for the repository itself
    fn base_path(&self) -> &str;

    /// Joins `path` onto this root, skipping empty segments
    fn join(&self, path: &str) -> String {
        self.base_path()
            .split('/')
            .chain(path.split('/'))
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl ContentRoot for Repository {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn repo(&self) -> &str {
        &self.name
    }

    fn base_path(&self) -> &str {
        ""
    }
}

impl ContentRoot for RepoDirectory {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn repo(&self) -> &str {
        &self.repo
    }

    fn base_path(&self) -> &str {
        &self.path
    }
}
