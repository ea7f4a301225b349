//! Live GitHub content source.
//!
//! Blocking HTTP client over the GitHub REST API:
//! - fingerprint: `GET {api}/repos/{owner}/{name}/activity`, first event's `after` sha
//! - contents: `GET {api}/repos/{owner}/{name}/zipball/{branch}` (redirected
//!   download of a zip wrapping the tree in one top-level directory)

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};
use ureq::Agent;
use ureq::http::Response;

use crate::error::SourceError;
use crate::source::ContentSource;
use crate::tree::{FileTree, MemoryTree};

/// Client marker sent with every request.
const USER_AGENT: &str = "thoughts-agent";

/// Media type for the v3 REST API.
const ACCEPT: &str = "application/vnd.github.v3+json";

/// Upper bound on a downloaded archive.
const MAX_ARCHIVE_BYTES: u64 = 64 * 1024 * 1024;

/// One entry of the repository activity feed.
#[derive(Deserialize)]
struct ActivityEvent {
    /// Commit sha after the pushed change.
    after: String,
}

/// Content source that talks to GitHub.
pub struct GitHubSource {
    agent: Agent,
    api_url: String,
    owner: String,
    name: String,
    branch: String,
}

impl GitHubSource {
    /// Create a source for `repo_url` (`https://github.com/{owner}/{name}`).
    ///
    /// # Arguments
    ///
    /// * `api_url` - REST API base URL (e.g. `https://api.github.com`)
    /// * `repo_url` - Repository URL
    /// * `branch` - Branch whose archive is downloaded
    /// * `timeout` - Global timeout per request
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidRepoUrl`] if `repo_url` does not name
    /// exactly one owner and one repository.
    pub fn new(
        api_url: &str,
        repo_url: &str,
        branch: &str,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let (owner, name) = parse_repo_url(repo_url)?;

        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        info!(owner = %owner, name = %name, branch, "Using GitHub repository");

        Ok(Self {
            agent,
            api_url: api_url.trim_end_matches('/').to_owned(),
            owner,
            name,
            branch: branch.to_owned(),
        })
    }

    /// Repository owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{suffix}",
            self.api_url, self.owner, self.name
        )
    }

    fn get(&self, url: &str) -> Result<Response<ureq::Body>, SourceError> {
        Ok(self
            .agent
            .get(url)
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .call()?)
    }
}

impl ContentSource for GitHubSource {
    fn last_hash(&self) -> Result<String, SourceError> {
        let url = self.repo_url("activity");
        debug!(url = %url, "Fetching last hash");

        let response = self.get(&url)?;
        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status != 200 {
            return Err(status_error(status, &mut body));
        }

        let text = body.read_to_string()?;
        let events: Vec<ActivityEvent> = serde_json::from_str(&text)?;
        let hash = events
            .into_iter()
            .next()
            .map(|event| event.after)
            .ok_or(SourceError::NoHistory)?;

        debug!(hash = %hash, "Fetched last hash");
        Ok(hash)
    }

    fn contents(&self) -> Result<Box<dyn FileTree>, SourceError> {
        let url = self.repo_url(&format!("zipball/{}", self.branch));
        debug!(url = %url, "Fetching zipball");

        let response = self.get(&url)?;
        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status != 200 && status != 302 {
            return Err(status_error(status, &mut body));
        }

        let bytes = body.with_config().limit(MAX_ARCHIVE_BYTES).read_to_vec()?;
        info!(bytes = bytes.len(), "Downloaded zipball");

        Ok(Box::new(MemoryTree::from_zip(bytes)?))
    }
}

fn status_error(status: u16, body: &mut ureq::Body) -> SourceError {
    let body = body
        .read_to_string()
        .unwrap_or_else(|_| "(unable to read error body)".to_owned());
    SourceError::Status { status, body }
}

/// Split `https://github.com/{owner}/{name}` into `(owner, name)`.
fn parse_repo_url(repo_url: &str) -> Result<(String, String), SourceError> {
    let invalid = || SourceError::InvalidRepoUrl(repo_url.to_owned());

    let rest = repo_url
        .strip_prefix("https://")
        .or_else(|| repo_url.strip_prefix("http://"))
        .ok_or_else(invalid)?;
    let (_host, path) = rest.split_once('/').ok_or_else(invalid)?;

    let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    match segments.as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => {
            Ok(((*owner).to_owned(), (*name).to_owned()))
        }
        _ => Err(invalid()),
    }
}
