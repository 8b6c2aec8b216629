//! The remote publish chain as an explicit state machine.
//!
//! ```text
//! ResolveRef -> ResolveTree -> BuildEntries -> CreateTree -> CreateCommit -> UpdateRef -> Done
//!      \____________\______________\______________\_____________\_____________\-> Failed
//! ```
//!
//! Each stage runs once, in order. The first error moves the machine to
//! `Failed` and stops it; nothing is retried and nothing already written to
//! the remote is rolled back.

use postwriter_common::config::Config;
use postwriter_common::post_slug;
use postwriter_editor_core::{AssetRegistry, BinaryAsset, Draft};

use crate::bundle::{FileContents, PostBundle};
use crate::credentials::Credentials;
use crate::error::PublishError;
use crate::github::{GitDataApi, TreeEntry};
use crate::scaffold::ScaffoldSource;

/// Stages of the publish chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    ResolveRef,
    ResolveTree,
    BuildEntries,
    CreateTree,
    CreateCommit,
    UpdateRef,
    Done,
    Failed,
}

/// Stage plus the results carried forward from earlier stages.
enum State {
    ResolveRef,
    ResolveTree {
        tip: String,
    },
    BuildEntries {
        tip: String,
        base_tree: String,
    },
    CreateTree {
        tip: String,
        base_tree: String,
        entries: Vec<TreeEntry>,
    },
    CreateCommit {
        tip: String,
        tree: String,
    },
    UpdateRef {
        commit: String,
    },
    Done {
        commit: String,
    },
}

impl State {
    fn stage(&self) -> PublishStage {
        match self {
            State::ResolveRef => PublishStage::ResolveRef,
            State::ResolveTree { .. } => PublishStage::ResolveTree,
            State::BuildEntries { .. } => PublishStage::BuildEntries,
            State::CreateTree { .. } => PublishStage::CreateTree,
            State::CreateCommit { .. } => PublishStage::CreateCommit,
            State::UpdateRef { .. } => PublishStage::UpdateRef,
            State::Done { .. } => PublishStage::Done,
        }
    }
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub commit_sha: String,
    pub slug: String,
    /// Browsable link to `posts/<slug>/`.
    pub url: String,
}

/// Repository-independent publish settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub branch: String,
    pub web_base: String,
}

impl From<&Config> for PublishOptions {
    fn from(config: &Config) -> Self {
        Self {
            branch: config.branch.clone(),
            web_base: config.web_base.clone(),
        }
    }
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Directory a post is committed under. The slug is not truncated.
pub fn post_dir(title: &str) -> (String, String) {
    let slug = post_slug(title, None);
    let dir = format!("posts/{slug}");
    (slug, dir)
}

/// Borrowed inputs for one run.
struct Job<'a> {
    credentials: &'a Credentials,
    draft: &'a Draft,
    registry: &'a AssetRegistry,
    dir: &'a str,
}

pub struct PublishPipeline<A, S> {
    api: A,
    scaffold: S,
    options: PublishOptions,
    history: Vec<PublishStage>,
}

impl<A: GitDataApi, S: ScaffoldSource> PublishPipeline<A, S> {
    pub fn new(api: A, scaffold: S, options: PublishOptions) -> Self {
        Self {
            api,
            scaffold,
            options,
            history: Vec::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Every stage entered by the last run, in order.
    pub fn history(&self) -> &[PublishStage] {
        &self.history
    }

    /// The stage the last run ended in, or `None` if it never started.
    pub fn stage(&self) -> Option<PublishStage> {
        self.history.last().copied()
    }

    /// Run the whole chain.
    ///
    /// Credentials are checked before anything else; a validation failure
    /// performs no network call and leaves the history empty.
    pub async fn publish(
        &mut self,
        credentials: &Credentials,
        draft: &Draft,
        registry: &AssetRegistry,
    ) -> Result<PublishReceipt, PublishError> {
        self.history.clear();
        credentials.validate()?;

        let (slug, dir) = post_dir(&draft.title);
        let job = Job {
            credentials,
            draft,
            registry,
            dir: &dir,
        };

        let mut state = State::ResolveRef;
        let commit = loop {
            self.history.push(state.stage());
            tracing::debug!(stage = ?state.stage(), "publish stage");
            state = match self.step(state, &job).await {
                Ok(State::Done { commit }) => {
                    self.history.push(PublishStage::Done);
                    break commit;
                }
                Ok(next) => next,
                Err(e) => {
                    let failed_at = self.stage();
                    self.history.push(PublishStage::Failed);
                    tracing::warn!(stage = ?failed_at, error = %e, "publish failed");
                    return Err(e);
                }
            };
        };

        let url = format!(
            "{}/{}/{}/tree/{}/{}/",
            self.options.web_base.trim_end_matches('/'),
            credentials.owner.trim(),
            credentials.repo.trim(),
            self.options.branch,
            dir
        );
        tracing::info!(%commit, %url, "post published");
        Ok(PublishReceipt {
            commit_sha: commit,
            slug,
            url,
        })
    }

    async fn step(&self, state: State, job: &Job<'_>) -> Result<State, PublishError> {
        Ok(match state {
            State::ResolveRef => State::ResolveTree {
                tip: self.api.get_ref_sha(&self.options.branch).await?,
            },
            State::ResolveTree { tip } => {
                let base_tree = self.api.get_commit_tree_sha(&tip).await?;
                State::BuildEntries { tip, base_tree }
            }
            State::BuildEntries { tip, base_tree } => State::CreateTree {
                entries: self.build_entries(job).await?,
                tip,
                base_tree,
            },
            State::CreateTree {
                tip,
                base_tree,
                entries,
            } => State::CreateCommit {
                tree: self.api.create_tree(&base_tree, &entries).await?,
                tip,
            },
            State::CreateCommit { tip, tree } => {
                let message = job.credentials.commit_message(&job.draft.title);
                State::UpdateRef {
                    commit: self.api.create_commit(&message, &tree, &tip).await?,
                }
            }
            State::UpdateRef { commit } => {
                self.api.update_ref(&self.options.branch, &commit).await?;
                State::Done { commit }
            }
            done @ State::Done { .. } => done,
        })
    }

    /// Text files go inline; images are uploaded as blobs and referenced by sha.
    async fn build_entries(&self, job: &Job<'_>) -> Result<Vec<TreeEntry>, PublishError> {
        let scaffold = self
            .scaffold
            .load()
            .await
            .map_err(PublishError::ScaffoldUnavailable)?;
        let bundle = PostBundle::build(job.draft, job.registry, Some(scaffold.as_str()))
            .map_err(PublishError::Manifest)?;

        let mut entries = Vec::with_capacity(bundle.len());
        for file in &bundle {
            let path = format!("{}/{}", job.dir, file.path);
            entries.push(match &file.contents {
                FileContents::Text(text) => TreeEntry::text(path, text.as_str()),
                FileContents::Image(asset) => self.upload(asset, path).await?,
            });
        }
        Ok(entries)
    }

    async fn upload(&self, asset: &BinaryAsset, path: String) -> Result<TreeEntry, PublishError> {
        let sha = self.api.create_blob(&asset.to_base64()).await?;
        tracing::debug!(name = asset.name(), %sha, "uploaded image blob");
        Ok(TreeEntry::blob(path, sha))
    }
}
