//! Repository operations: clone, fast-forward update, rollback, structure check
//!
//! Long transfers are bounded by a deadline enforced through libgit2's
//! transfer callback; returning `false` from the callback aborts the
//! transfer, which surfaces as [`Error::Timeout`] or [`Error::Cancelled`]
//! instead of an indefinite block.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{ErrorClass, ErrorCode, FetchOptions, RemoteCallbacks, Repository, ResetType};

use ext_fs::CancelFlag;
use ext_fs::paths::MANIFEST_FILENAME;
use ext_meta::{ValidationIssue, ValidationResult};

use crate::record::RepositoryRecord;
use crate::{Error, Result};

/// Default bound on any single git network operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Transfer progress snapshot passed to the optional progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub received_objects: usize,
    pub total_objects: usize,
    pub received_bytes: usize,
}

type ProgressFn = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Outcome of a fast-forward-only update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Local HEAD already matches the remote.
    UpToDate,
    /// Fast-forwarded from `from` to `to`.
    Updated { from: String, to: String },
    /// Histories diverged; the working tree was left untouched.
    Conflict { local: String, remote: String },
}

/// Git client for plugin repositories.
pub struct RepositoryManager {
    timeout: Duration,
    cancel: CancelFlag,
    progress: Option<ProgressFn>,
}

impl Default for RepositoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryManager {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            cancel: CancelFlag::new(),
            progress: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Build fetch options whose transfer callback enforces the deadline and
    /// cancellation flag and forwards progress.
    fn fetch_options(&self, deadline: Instant) -> FetchOptions<'_> {
        let cancel = self.cancel.clone();
        let progress = self.progress.clone();

        let mut callbacks = RemoteCallbacks::new();
        callbacks.transfer_progress(move |stats| {
            if let Some(cb) = &progress {
                cb(TransferProgress {
                    received_objects: stats.received_objects(),
                    total_objects: stats.total_objects(),
                    received_bytes: stats.received_bytes(),
                });
            }
            !cancel.is_cancelled() && Instant::now() < deadline
        });

        let mut opts = FetchOptions::new();
        opts.remote_callbacks(callbacks);
        opts
    }

    /// Map an aborted or failed transfer to the taxonomy.
    fn classify(&self, url: &str, deadline: Instant, err: git2::Error) -> Error {
        if self.cancel.is_cancelled() {
            return Error::Cancelled {
                url: url.to_string(),
            };
        }
        if Instant::now() >= deadline && err.code() == ErrorCode::User {
            return Error::Timeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            };
        }
        match (err.class(), err.code()) {
            (_, ErrorCode::Auth) | (ErrorClass::Ssh, _) => Error::AuthFailed {
                url: url.to_string(),
            },
            (ErrorClass::Http, ErrorCode::NotFound) | (ErrorClass::Repository, ErrorCode::NotFound) => {
                Error::RepositoryNotFound {
                    url: url.to_string(),
                }
            }
            (ErrorClass::Net, _) | (ErrorClass::Http, _) => Error::Network {
                url: url.to_string(),
                message: err.message().to_string(),
            },
            // Local-path remotes report a missing repository as Os/NotFound
            (_, ErrorCode::NotFound) => Error::RepositoryNotFound {
                url: url.to_string(),
            },
            _ => Error::Git(err),
        }
    }

    /// Clone `url` into `target`.
    ///
    /// On any mid-clone failure the target directory is removed entirely; a
    /// partial clone is never left on disk.
    pub fn clone(&self, url: &str, target: &Path) -> Result<RepositoryRecord> {
        let deadline = Instant::now() + self.timeout;
        tracing::info!(url, target = %target.display(), "cloning repository");

        let result = RepoBuilder::new()
            .fetch_options(self.fetch_options(deadline))
            .clone(url, target);

        let repo = match result {
            Ok(repo) => repo,
            Err(e) => {
                if target.exists() {
                    if let Err(rm) = fs::remove_dir_all(target) {
                        tracing::warn!(
                            target = %target.display(),
                            error = %rm,
                            "failed to remove partial clone"
                        );
                    }
                }
                return Err(self.classify(url, deadline, e));
            }
        };

        let sha = head_sha(&repo)?;
        RepositoryRecord::new(url, target, sha)
    }

    /// Fast-forward-only update.
    ///
    /// Diverged history returns [`UpdateStatus::Conflict`] with the working
    /// tree byte-for-byte unchanged; this method never merges or rebases.
    pub fn update(&self, record: &mut RepositoryRecord) -> Result<UpdateStatus> {
        let deadline = Instant::now() + self.timeout;
        let repo = Repository::open(&record.local_path)?;
        let branch = current_branch(&repo)?;

        let mut remote = repo.find_remote("origin")?;
        remote
            .fetch(&[branch.as_str()], Some(&mut self.fetch_options(deadline)), None)
            .map_err(|e| self.classify(&record.url, deadline, e))?;

        let fetch_head = repo.find_reference("FETCH_HEAD")?;
        let fetch_commit = fetch_head.peel_to_commit()?;
        let head_commit = repo.head()?.peel_to_commit()?;

        let annotated = repo.find_annotated_commit(fetch_commit.id())?;
        let (analysis, _) = repo.merge_analysis(&[&annotated])?;

        if analysis.is_up_to_date() {
            record.commit = head_commit.id().to_string();
            return Ok(UpdateStatus::UpToDate);
        }

        if analysis.is_fast_forward() {
            let refname = format!("refs/heads/{branch}");
            let mut reference = repo.find_reference(&refname)?;
            reference.set_target(
                fetch_commit.id(),
                &format!("update: fast-forward to {}", fetch_commit.id()),
            )?;
            repo.checkout_head(Some(CheckoutBuilder::default().force()))?;

            let from = head_commit.id().to_string();
            let to = fetch_commit.id().to_string();
            tracing::info!(repo = %record.key(), %from, %to, "fast-forwarded");
            record.commit = to.clone();
            record.last_updated = Utc::now();
            return Ok(UpdateStatus::Updated { from, to });
        }

        tracing::warn!(repo = %record.key(), "histories diverged; leaving repository untouched");
        Ok(UpdateStatus::Conflict {
            local: head_commit.id().to_string(),
            remote: fetch_commit.id().to_string(),
        })
    }

    /// Hard-reset the working tree to `target_sha`.
    ///
    /// Postcondition: `record.commit == target_sha == HEAD`.
    pub fn rollback(&self, record: &mut RepositoryRecord, target_sha: &str) -> Result<()> {
        let repo = Repository::open(&record.local_path)?;
        let oid = git2::Oid::from_str(target_sha).map_err(|_| Error::CommitNotFound {
            sha: target_sha.to_string(),
            path: record.local_path.clone(),
        })?;
        let commit = repo.find_commit(oid).map_err(|_| Error::CommitNotFound {
            sha: target_sha.to_string(),
            path: record.local_path.clone(),
        })?;

        repo.reset(
            commit.as_object(),
            ResetType::Hard,
            Some(CheckoutBuilder::default().force()),
        )?;

        record.commit = target_sha.to_string();
        record.last_updated = Utc::now();
        tracing::info!(repo = %record.key(), sha = target_sha, "rolled back");
        Ok(())
    }

    /// Confirm at least one plugin manifest exists beneath `path` before the
    /// repository is registered.
    pub fn validate_structure(&self, path: &Path) -> Result<ValidationResult> {
        let mut manifests = Vec::new();
        find_manifests(path, &mut manifests)?;

        let mut result = ValidationResult::ok();
        if manifests.is_empty() {
            result.push(
                ValidationIssue::error(
                    "REPO_NO_MANIFEST",
                    format!(
                        "no {MANIFEST_FILENAME} found under {}",
                        path.display()
                    ),
                )
                .with_fix(format!(
                    "add a {MANIFEST_FILENAME} at the root of each plugin directory"
                )),
            );
        }
        Ok(result)
    }
}

/// HEAD commit SHA as a hex string.
pub fn head_sha(repo: &Repository) -> Result<String> {
    Ok(repo.head()?.peel_to_commit()?.id().to_string())
}

fn current_branch(repo: &Repository) -> Result<String> {
    let head = repo.head()?;
    Ok(head.shorthand().unwrap_or("HEAD").to_string())
}

fn find_manifests(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| ext_fs::Error::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ext_fs::Error::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == ".git") {
                continue;
            }
            find_manifests(&path, out)?;
        } else if path.file_name().is_some_and(|n| n == MANIFEST_FILENAME) {
            out.push(path);
        }
    }
    Ok(())
}
