use serde::{Deserialize, Serialize};

/// Connection coordinates for the remote document store, as collected by the
/// settings layer. The settings layer persists this; the core only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Remote store account that owns the repository.
    #[serde(default)]
    pub username: String,
    /// Bearer credential. Optional for public read paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    #[serde(default)]
    pub repository: String,
    #[serde(default = "StoreConfig::default_branch")]
    pub branch: String,
    /// Document-level alert destination merged into the document on commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_alert_email: Option<String>,
}

impl StoreConfig {
    pub fn new(username: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            credential: None,
            repository: repository.into(),
            branch: Self::default_branch(),
            default_alert_email: None,
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_default_alert_email(mut self, email: impl Into<String>) -> Self {
        self.default_alert_email = Some(email.into());
        self
    }

    /// Synchronization is blocked until both the owner and the repository
    /// name are known.
    pub fn is_configured(&self) -> bool {
        !self.username.trim().is_empty() && !self.repository.trim().is_empty()
    }

    fn default_branch() -> String {
        String::from("main")
    }
}
