use serde::{Deserialize, Serialize};

pub mod page;
pub use page::Page;

// -------------------------------------------------------------------------------------------------
// ClientError
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
pub struct ClientError {
    pub message: String,
    pub documentation_url: Option<String>,
    pub errors: Option<Vec<Error>>,
}

// -------------------------------------------------------------------------------------------------
// Error
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
pub struct Error {
    pub resource: Option<String>,
    pub field: Option<String>,
    pub code: String,
    pub message: Option<String>,
}

impl ClientError {
    /// The top-level message followed by any per-field detail messages.
    pub fn summary(&self) -> String {
        let mut out = self.message.clone();
        for e in self.errors.iter().flatten() {
            if let Some(m) = &e.message {
                out.push_str("; ");
                out.push_str(m);
            }
        }
        out
    }
}

// -------------------------------------------------------------------------------------------------
// RateLimit
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
pub struct RateLimitOverview {
    pub rate: Rate,
}

// -------------------------------------------------------------------------------------------------
// Rate
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
pub struct Rate {
    pub limit: i64,
    pub remaining: i64,
    pub reset: i64,
    pub used: i64,
}

// -------------------------------------------------------------------------------------------------
// Organization
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
pub struct Organization {
    pub login: String,
    pub id: i64,
    pub url: String,
    pub description: Option<String>,
}

// -------------------------------------------------------------------------------------------------
// Owner
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

// -------------------------------------------------------------------------------------------------
// Repository
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub private: bool,
    pub html_url: String,
    pub description: Option<String>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    pub clone_url: String,
    pub ssh_url: String,
    pub default_branch: Option<String>,
    pub visibility: Option<String>,
}

// -------------------------------------------------------------------------------------------------
// request bodies
// -------------------------------------------------------------------------------------------------
/// Body of a request to create a repository.
#[derive(Debug, Serialize)]
pub struct NewRepository<'a> {
    pub name: &'a str,
    pub private: bool,

    /// Create an initial commit with an empty README
    pub auto_init: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CollaboratorPermission<'a> {
    pub permission: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewFileContents<'a> {
    pub message: &'a str,

    /// base64-encoded file contents
    pub content: String,
}

// -------------------------------------------------------------------------------------------------
// CollaboratorStatus
// -------------------------------------------------------------------------------------------------
/// What happened when a user was added as a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaboratorStatus {
    /// An invitation was sent and awaits acceptance
    Invited,

    /// The user already had access
    AlreadyCollaborator,
}

impl std::fmt::Display for CollaboratorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CollaboratorStatus::Invited => "invited",
            CollaboratorStatus::AlreadyCollaborator => "already a collaborator",
        };
        write!(f, "{s}")
    }
}
