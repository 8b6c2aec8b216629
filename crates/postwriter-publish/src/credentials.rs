//! GitHub credentials entered for a publish.

use std::fmt;

use crate::error::PublishError;

/// Status line shown while the publish action is disabled.
pub const READINESS_MESSAGE: &str = "Please fill out GitHub token, username, and repository.";

/// Environment variable consulted when no token is passed explicitly.
pub const TOKEN_ENV: &str = "POSTWRITER_GITHUB_TOKEN";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub owner: String,
    pub repo: String,
    /// Commit message; empty means the generated default.
    pub message: String,
}

impl Credentials {
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            message: String::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Token, owner and repo are all non-blank.
    pub fn is_ready(&self) -> bool {
        [&self.token, &self.owner, &self.repo]
            .iter()
            .all(|s| !s.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), PublishError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(PublishError::NotReady)
        }
    }

    /// The entered message, or `New blog post: <title>` when blank.
    pub fn commit_message(&self, title: &str) -> String {
        let message = self.message.trim();
        if message.is_empty() {
            format!("New blog post: {}", title)
        } else {
            message.to_owned()
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("message", &self.message)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_requires_all_three() {
        assert!(Credentials::new("t", "o", "r").is_ready());
        assert!(!Credentials::new("", "o", "r").is_ready());
        assert!(!Credentials::new("t", "  ", "r").is_ready());
        let err = Credentials::new("t", "o", "").validate().unwrap_err();
        assert_eq!(err.to_string(), READINESS_MESSAGE);
    }

    #[test]
    fn default_commit_message() {
        let creds = Credentials::new("t", "o", "r");
        assert_eq!(creds.commit_message("Hello"), "New blog post: Hello");
        let creds = creds.with_message("  custom  ");
        assert_eq!(creds.commit_message("Hello"), "custom");
    }

    #[test]
    fn token_is_redacted() {
        let debug = format!("{:?}", Credentials::new("ghp_secret", "o", "r"));
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("<redacted>"));
    }
}
