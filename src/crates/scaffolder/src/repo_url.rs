//! Repo URL parsing and workspace path resolution
//!
//! Actions receive their target as a `repoUrl` of the form
//! `host?owner=o&repo=r&workspace=w&project=p`. The host selects the
//! integration; the query carries provider-specific coordinates.

use crate::error::{Result, ScaffolderError};
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Coordinates parsed from a `repoUrl`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    /// Host including a non-default port (`bitbucket.org`, `localhost:8080`)
    pub host: String,
    pub repo: String,
    pub owner: Option<String>,
    pub organization: Option<String>,
    pub workspace: Option<String>,
    pub project: Option<String>,
}

/// Parse a `repoUrl` such as `bitbucket.org?workspace=acme&project=WEB&repo=widget`.
///
/// Only `host` and `repo` are required here; provider-specific coordinates
/// are checked by the action that needs them.
pub fn parse_repo_url(repo_url: &str) -> Result<RepoSpec> {
    let parsed = Url::parse(&format!("https://{}", repo_url)).map_err(|e| {
        ScaffolderError::Input(format!("Invalid repo URL passed to publisher: {}, {}", repo_url, e))
    })?;

    let host = match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) if !host.is_empty() => format!("{}:{}", host, port),
        (Some(host), None) if !host.is_empty() => host.to_string(),
        _ => {
            return Err(ScaffolderError::Input(format!(
                "Invalid repo URL passed to publisher: {}, missing host",
                repo_url
            )))
        }
    };

    let param = |name: &str| {
        parsed
            .query_pairs()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    };

    let repo = param("repo").ok_or_else(|| {
        ScaffolderError::Input(format!(
            "Invalid repo URL passed to publisher: {}, missing repo",
            repo_url
        ))
    })?;

    Ok(RepoSpec {
        host,
        repo,
        owner: param("owner"),
        organization: param("organization"),
        workspace: param("workspace"),
        project: param("project"),
    })
}

/// Resolve the directory to publish: `source_path` inside `workspace_path`,
/// or the workspace itself. Paths that would leave the workspace are rejected.
pub fn get_repo_source_directory(workspace_path: &Path, source_path: Option<&str>) -> Result<PathBuf> {
    let Some(source_path) = source_path.filter(|p| !p.is_empty()) else {
        return Ok(workspace_path.to_path_buf());
    };

    let mut resolved = workspace_path.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(source_path).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(segment) => {
                resolved.push(segment);
                depth += 1;
            }
            Component::ParentDir if depth > 0 => {
                resolved.pop();
                depth -= 1;
            }
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ScaffolderError::Input(format!(
                    "Relative path is not allowed to refer to a directory outside its parent: {}",
                    source_path
                )));
            }
        }
    }

    Ok(resolved)
}
