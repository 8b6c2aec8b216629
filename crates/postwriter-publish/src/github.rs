//! GitHub git-data API.
//!
//! Only the six calls the publish chain needs: read a ref, read a commit,
//! create a blob, create a tree, create a commit, move a ref.

use serde::Serialize;
use serde_json::{Value, json};
use std::future::Future;

use crate::credentials::Credentials;
use crate::error::PublishError;

const USER_AGENT: &str = concat!("postwriter/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// File mode for a regular blob.
const FILE_MODE: &str = "100644";

/// One entry of a tree to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Inline UTF-8 content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Sha of an uploaded blob.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl TreeEntry {
    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FILE_MODE,
            kind: "blob",
            content: Some(content.into()),
            sha: None,
        }
    }

    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FILE_MODE,
            kind: "blob",
            content: None,
            sha: Some(sha.into()),
        }
    }
}

/// The git-data calls used by the publish pipeline. Every call returns the
/// sha GitHub assigned, except `update_ref`.
pub trait GitDataApi {
    fn get_ref_sha(
        &self,
        branch: &str,
    ) -> impl Future<Output = Result<String, PublishError>> + Send;

    fn get_commit_tree_sha(
        &self,
        commit_sha: &str,
    ) -> impl Future<Output = Result<String, PublishError>> + Send;

    /// Upload base64 content as a blob.
    fn create_blob(
        &self,
        content_base64: &str,
    ) -> impl Future<Output = Result<String, PublishError>> + Send;

    fn create_tree(
        &self,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> impl Future<Output = Result<String, PublishError>> + Send;

    fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> impl Future<Output = Result<String, PublishError>> + Send;

    fn update_ref(
        &self,
        branch: &str,
        commit_sha: &str,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// `reqwest` client for one repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    token: String,
}

impl GitHubClient {
    pub fn new(client: reqwest::Client, api_base: &str, credentials: &Credentials) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
            owner: credentials.owner.trim().to_owned(),
            repo: credentials.repo.trim().to_owned(),
            token: credentials.token.trim().to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/git/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, PublishError> {
        let response = request
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(|source| PublishError::Http { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api {
                operation,
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|source| PublishError::Http { operation, source })
    }

    async fn send_for_sha(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
        pointer: &str,
    ) -> Result<String, PublishError> {
        let body = self.send(operation, request).await?;
        sha_at(&body, pointer).ok_or(PublishError::MissingSha { operation })
    }
}

fn sha_at(body: &Value, pointer: &str) -> Option<String> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

impl GitDataApi for GitHubClient {
    async fn get_ref_sha(&self, branch: &str) -> Result<String, PublishError> {
        let request = self.client.get(self.url(&format!("ref/heads/{branch}")));
        self.send_for_sha("get ref", request, "/object/sha").await
    }

    async fn get_commit_tree_sha(&self, commit_sha: &str) -> Result<String, PublishError> {
        let request = self.client.get(self.url(&format!("commits/{commit_sha}")));
        self.send_for_sha("get commit", request, "/tree/sha").await
    }

    async fn create_blob(&self, content_base64: &str) -> Result<String, PublishError> {
        let request = self.client.post(self.url("blobs")).json(&json!({
            "content": content_base64,
            "encoding": "base64",
        }));
        self.send_for_sha("create blob", request, "/sha").await
    }

    async fn create_tree(
        &self,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, PublishError> {
        let request = self.client.post(self.url("trees")).json(&json!({
            "base_tree": base_tree,
            "tree": entries,
        }));
        self.send_for_sha("create tree", request, "/sha").await
    }

    async fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<String, PublishError> {
        let request = self.client.post(self.url("commits")).json(&json!({
            "message": message,
            "tree": tree_sha,
            "parents": [parent_sha],
        }));
        self.send_for_sha("create commit", request, "/sha").await
    }

    async fn update_ref(&self, branch: &str, commit_sha: &str) -> Result<(), PublishError> {
        let request = self
            .client
            .patch(self.url(&format!("refs/heads/{branch}")))
            .json(&json!({
                "sha": commit_sha,
                "force": false,
            }));
        self.send("update ref", request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_entries_serialize_like_the_api_expects() {
        let entries = vec![
            TreeEntry::text("posts/a/content.md", "# hi"),
            TreeEntry::blob("posts/a/cat.png", "abc123"),
        ];
        insta::assert_snapshot!(serde_json::to_string_pretty(&entries).unwrap(), @r##"
        [
          {
            "path": "posts/a/content.md",
            "mode": "100644",
            "type": "blob",
            "content": "# hi"
          },
          {
            "path": "posts/a/cat.png",
            "mode": "100644",
            "type": "blob",
            "sha": "abc123"
          }
        ]
        "##);
    }

    #[test]
    fn urls_and_sha_extraction() {
        let client = GitHubClient::new(
            reqwest::Client::new(),
            "https://api.github.com/",
            &Credentials::new("t", " me ", "blog"),
        );
        assert_eq!(
            client.url("ref/heads/main"),
            "https://api.github.com/repos/me/blog/git/ref/heads/main"
        );

        let body = json!({ "object": { "sha": "deadbeef" }, "tree": { "sha": "" } });
        assert_eq!(sha_at(&body, "/object/sha").as_deref(), Some("deadbeef"));
        assert_eq!(sha_at(&body, "/tree/sha"), None);
        assert_eq!(sha_at(&body, "/sha"), None);
    }
}
