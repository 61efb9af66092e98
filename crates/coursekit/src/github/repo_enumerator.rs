use regex::Regex;

use super::models::Repository;
use super::{Client, Result};

/// A `RepoEnumerator` provides higher-level functionality on top of the GitHub REST API to list
/// the repositories of an organization.
pub struct RepoEnumerator<'c> {
    client: &'c Client,
}

impl<'c> RepoEnumerator<'c> {
    pub fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// Enumerate the accessible repositories that belong to the given organization, following
    /// pagination to the end.
    pub async fn enumerate_org_repos(&self, orgname: &str) -> Result<Vec<Repository>> {
        let repo_page = self.client.get_org_repos(orgname).await?;
        self.client.get_all(repo_page).await
    }

    /// Enumerate the organization's repositories that pass `filter`, sorted by name.
    pub async fn enumerate_filtered(
        &self,
        orgname: &str,
        filter: &RepoFilter,
    ) -> Result<Vec<Repository>> {
        let mut repos = self.enumerate_org_repos(orgname).await?;
        repos.retain(|r| filter.filter(r));
        repos.sort_by(|a, b| a.name.cmp(&b.name));
        repos.dedup_by(|a, b| a.id == b.id);
        Ok(repos)
    }
}

/// Which repository visibilities to select.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    All,
    Public,
    Private,
}

impl Visibility {
    fn filter(&self, repo: &Repository) -> bool {
        let is_private = match repo.visibility.as_deref() {
            Some(v) => v != "public",
            None => repo.private,
        };
        match self {
            Visibility::All => true,
            Visibility::Public => !is_private,
            Visibility::Private => is_private,
        }
    }
}

/// Selects repositories from an organization listing.
///
/// Forks and archived repositories are excluded unless asked for. Name matching is a
/// case-insensitive substring test and/or a regular expression search.
#[derive(Debug, Default)]
pub struct RepoFilter {
    pub include_forks: bool,
    pub include_archived: bool,
    pub visibility: Visibility,
    pub name_contains: Option<String>,
    pub name_regex: Option<Regex>,
}

impl RepoFilter {
    pub fn filter(&self, repo: &Repository) -> bool {
        if repo.fork && !self.include_forks {
            return false;
        }
        if repo.archived && !self.include_archived {
            return false;
        }
        if !self.visibility.filter(repo) {
            return false;
        }
        if let Some(needle) = &self.name_contains {
            if !repo.name.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(re) = &self.name_regex {
            if !re.is_match(&repo.name) {
                return false;
            }
        }
        true
    }
}
