//! Initial commit and push of a workspace directory
//!
//! [`init_repo_and_push`] turns a directory into a repository whose default
//! branch holds a single commit of every file, then pushes that branch to
//! the freshly created remote. libgit2 is blocking, so the work runs on the
//! blocking thread pool.
//!
//! Re-running against a directory that already went through a failed push
//! reuses the existing commit when the tree is unchanged, so a retried push
//! sends the same commit hash.

use crate::error::{Result, ScaffolderError};
use git2::{
    Commit, Cred, IndexAddOption, PushOptions, RemoteCallbacks, Repository, RepositoryInitOptions,
    Signature,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

pub const DEFAULT_AUTHOR_NAME: &str = "Scaffolder";
pub const DEFAULT_AUTHOR_EMAIL: &str = "scaffolder@backstage.io";
pub const DEFAULT_COMMIT_MESSAGE: &str = "initial commit";

/// Author overrides from `scaffolder.defaultAuthor`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitAuthorInfo {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Credentials for the push
#[derive(Debug, Clone)]
pub struct GitAuth {
    pub username: String,
    pub password: String,
}

/// Produces an ASCII-armored detached signature over a raw commit object
pub trait CommitSigner: Send + Sync {
    fn sign(&self, commit: &str) -> Result<String>;
}

pub struct InitRepoOptions {
    pub dir: PathBuf,
    pub remote_url: String,
    pub auth: GitAuth,
    pub default_branch: String,
    pub commit_message: Option<String>,
    pub author: GitAuthorInfo,
    pub signer: Option<Arc<dyn CommitSigner>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    pub commit_hash: String,
}

pub async fn init_repo_and_push(options: InitRepoOptions) -> Result<CommitResult> {
    tokio::task::spawn_blocking(move || init_repo_and_push_blocking(&options))
        .await
        .map_err(|e| ScaffolderError::Git(format!("git task failed: {}", e)))?
}

fn init_repo_and_push_blocking(options: &InitRepoOptions) -> Result<CommitResult> {
    let branch = options.default_branch.as_str();
    tracing::info!("Initializing git repository in {}", options.dir.display());

    let mut init = RepositoryInitOptions::new();
    init.initial_head(branch);
    let repo = Repository::init_opts(&options.dir, &init)?;

    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    index.write()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let author = Signature::now(
        options.author.name.as_deref().unwrap_or(DEFAULT_AUTHOR_NAME),
        options.author.email.as_deref().unwrap_or(DEFAULT_AUTHOR_EMAIL),
    )?;
    let message = options
        .commit_message
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_COMMIT_MESSAGE);

    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let commit_id = match &parent {
        Some(head) if head.tree_id() == tree_id => {
            tracing::debug!("Reusing existing commit {}", head.id());
            head.id()
        }
        _ => {
            let parents: Vec<&Commit<'_>> = parent.iter().collect();
            match &options.signer {
                Some(signer) => {
                    let buffer = repo.commit_create_buffer(&author, &author, message, &tree, &parents)?;
                    let content = buffer
                        .as_str()
                        .ok_or_else(|| ScaffolderError::Git("commit buffer is not valid UTF-8".to_string()))?;
                    let signature = signer.sign(content)?;
                    let id = repo.commit_signed(content, &signature, None)?;
                    repo.reference(&format!("refs/heads/{}", branch), id, true, message)?;
                    id
                }
                None => repo.commit(Some("HEAD"), &author, &author, message, &tree, &parents)?,
            }
        }
    };

    push(&repo, options)?;

    tracing::info!("Pushed {} to {}", commit_id, options.remote_url);
    Ok(CommitResult {
        commit_hash: commit_id.to_string(),
    })
}

fn push(repo: &Repository, options: &InitRepoOptions) -> Result<()> {
    if repo.find_remote("origin").is_ok() {
        repo.remote_set_url("origin", &options.remote_url)?;
    } else {
        repo.remote("origin", &options.remote_url)?;
    }
    let mut remote = repo.find_remote("origin")?;

    let refspec = format!(
        "refs/heads/{branch}:refs/heads/{branch}",
        branch = options.default_branch
    );
    let mut rejected = None;
    {
        let mut credential_attempts = 0;
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|_url, _username, _allowed| {
            credential_attempts += 1;
            if credential_attempts > 1 {
                return Err(git2::Error::from_str("authentication failed"));
            }
            Cred::userpass_plaintext(&options.auth.username, &options.auth.password)
        });
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                rejected = Some(format!("{}: {}", refname, status));
            }
            Ok(())
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);
        remote.push(&[refspec.as_str()], Some(&mut push_options))?;
    }

    match rejected {
        Some(reason) => Err(ScaffolderError::Git(format!("push rejected, {}", reason))),
        None => Ok(()),
    }
}

/// Signs commits with `gpg` using an armored private key from config.
///
/// The key is imported into a throwaway keyring for every signature, so the
/// user's own keyring is never touched.
pub struct GpgSigner {
    armored_key: String,
    program: String,
}

impl GpgSigner {
    pub fn new(armored_key: impl Into<String>) -> Self {
        Self {
            armored_key: armored_key.into(),
            program: "gpg".to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn run(&self, home: &Path, args: &[&str], input: &[u8]) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .arg("--homedir")
            .arg(home)
            .args(["--batch", "--yes", "--no-tty"])
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ScaffolderError::Git(format!("failed to run {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input)?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ScaffolderError::Git(format!(
                "{} {} failed: {}",
                self.program,
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl CommitSigner for GpgSigner {
    fn sign(&self, commit: &str) -> Result<String> {
        let home = tempfile::tempdir()?;
        self.run(home.path(), &["--import"], self.armored_key.as_bytes())?;
        let signature = self.run(
            home.path(),
            &["--pinentry-mode", "loopback", "--armor", "--detach-sign"],
            commit.as_bytes(),
        )?;
        String::from_utf8(signature)
            .map_err(|e| ScaffolderError::Git(format!("signature is not valid UTF-8: {}", e)))
    }
}
