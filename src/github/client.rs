//! Read-only GitHub REST client
//!
//! Requests go through a `Fetcher`, so wrapping the client around an
//! `Interceptor` caches every API response with stale-while-revalidate.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use super::types::{
    ContentEntry, ContentKind, ContentRoot, RepoDirectory, RepoFile, Repository,
    RepositoryPayload,
};
use crate::cache::RequestDescriptor;
use crate::fetch::{FetchError, Fetcher};

const GITHUB_API_BASE: &str = "https://api.github.com/";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Errors returned by the GitHub client
#[derive(Debug, Error)]
pub enum GithubError {
    /// The request could not be completed
    #[error("GitHub request failed: {0}")]
    Fetch(#[from] FetchError),

    /// The API answered with a non-success status
    #[error("{status}: {url}")]
    Status { status: StatusCode, url: String },

    /// The response body was not the expected JSON
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The endpoint could not be turned into a URL
    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

/// GitHub API client issuing requests through a fetcher
#[derive(Debug, Clone)]
pub struct GithubClient<F> {
    fetcher: F,
    base_url: Url,
}

impl<F: Fetcher> GithubClient<F> {
    /// Create a client for the public GitHub API
    pub fn new(fetcher: F) -> Result<Self, GithubError> {
        Self::with_base_url(fetcher, GITHUB_API_BASE)
    }

    /// Create a client for a different API root (GitHub Enterprise, tests)
    pub fn with_base_url(fetcher: F, base_url: &str) -> Result<Self, GithubError> {
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };
        Ok(Self { fetcher, base_url })
    }

    /// Make a GET request and decode the JSON body
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, GithubError> {
        let mut url = self.base_url.join(endpoint)?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let request = RequestDescriptor::get(url).with_header("Accept", GITHUB_ACCEPT);
        let response = self.fetcher.fetch(&request).await?;
        if !response.ok() {
            return Err(GithubError::Status {
                status: response.status,
                url: response.url.to_string(),
            });
        }

        Ok(serde_json::from_slice(&response.body)?)
    }

    /// List a user's repositories; `per_page` and `page` are passed through
    pub async fn user_repos(
        &self,
        username: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<Repository>, GithubError> {
        let payloads: Vec<RepositoryPayload> = self
            .get(
                &format!("users/{}/repos", username),
                &[("per_page", per_page.to_string()), ("page", page.to_string())],
            )
            .await?;

        Ok(payloads
            .into_iter()
            .map(|payload| Repository {
                owner: username.to_string(),
                name: payload.name,
                full_name: payload.full_name,
            })
            .collect())
    }

    /// Fetch a single repository of a user
    pub async fn repo(&self, username: &str, name: &str) -> Result<Repository, GithubError> {
        let payload: RepositoryPayload = self
            .get(&format!("repos/{}/{}", username, name), &[])
            .await?;

        Ok(Repository {
            owner: username.to_string(),
            name: payload.name,
            full_name: payload.full_name,
        })
    }

    /// Raw contents listing of `path` below `root`
    pub async fn contents<R: ContentRoot>(
        &self,
        root: &R,
        path: &str,
    ) -> Result<Vec<ContentEntry>, GithubError> {
        self.get(&contents_endpoint(root, path), &[]).await
    }

    /// Subdirectories of `path` below `root`
    pub async fn directories<R: ContentRoot>(
        &self,
        root: &R,
        path: &str,
    ) -> Result<Vec<RepoDirectory>, GithubError> {
        Ok(self
            .contents(root, path)
            .await?
            .into_iter()
            .filter(|entry| entry.kind == ContentKind::Dir)
            .map(|entry| RepoDirectory {
                owner: root.owner().to_string(),
                repo: root.repo().to_string(),
                name: entry.name,
                path: entry.path,
            })
            .collect())
    }

    /// Directory handle for `path` below `root`; issues no request
    pub fn directory<R: ContentRoot>(&self, root: &R, path: &str) -> RepoDirectory {
        let path = root.join(path);
        RepoDirectory {
            owner: root.owner().to_string(),
            repo: root.repo().to_string(),
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            path,
        }
    }

    /// Files directly inside `path` below `root`
    pub async fn files<R: ContentRoot>(
        &self,
        root: &R,
        path: &str,
    ) -> Result<Vec<RepoFile>, GithubError> {
        Ok(self
            .contents(root, path)
            .await?
            .into_iter()
            .filter(|entry| entry.kind == ContentKind::File)
            .map(RepoFile::from)
            .collect())
    }

    /// A single file at `path` below `root`
    pub async fn file<R: ContentRoot>(&self, root: &R, path: &str) -> Result<RepoFile, GithubError> {
        let entry: ContentEntry = self.get(&contents_endpoint(root, path), &[]).await?;
        Ok(entry.into())
    }
}

fn contents_endpoint<R: ContentRoot>(root: &R, path: &str) -> String {
    format!(
        "repos/{}/{}/contents/{}",
        root.owner(),
        root.repo(),
        root.join(path)
    )
}
