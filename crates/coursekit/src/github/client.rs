use base64::Engine;
use chrono::{DateTime, Duration, TimeDelta, TimeZone, Utc};
use reqwest::{header, header::HeaderValue, Method, StatusCode, Url};
use secrecy::ExposeSecret;
use tracing::debug;

use super::models::{
    ClientError, CollaboratorPermission, CollaboratorStatus, NewFileContents, NewRepository,
    Organization, Page, RateLimitOverview, Repository,
};
use super::rate_limit::Pacer;
use super::{Auth, ClientBuilder, Error, Result};

// -------------------------------------------------------------------------------------------------
// Client
// -------------------------------------------------------------------------------------------------
pub struct Client {
    pub(super) base_url: Url,
    pub(super) inner: reqwest::Client,
    pub(super) auth: Auth,
    pub(super) token_env_var: Option<&'static str>,
    pub(super) pacer: Pacer,
}

const MAX_PER_PAGE: (&str, &str) = ("per_page", "100");

impl Client {
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    pub fn is_authenticated(&self) -> bool {
        match self.auth {
            Auth::Unauthenticated => false,
            Auth::PersonalAccessToken(_) => true,
        }
    }

    /// The environment variable the access token was read from, if it came from one.
    pub fn token_env_var(&self) -> Option<&'static str> {
        self.token_env_var
    }

    pub async fn get_rate_limit(&self) -> Result<RateLimitOverview> {
        let response = self.get(&["rate_limit"], &[]).await?;
        Ok(response.json().await?)
    }

    pub async fn get_org(&self, orgname: &str) -> Result<Organization> {
        let response = self.get(&["orgs", orgname], &[]).await?;
        Ok(response.json().await?)
    }

    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        let response = self.get(&["repos", owner, repo], &[]).await?;
        Ok(response.json().await?)
    }

    /// Create a repository in the given organization.
    ///
    /// If a repository with that name already exists, `Error::AlreadyExists` is returned.
    pub async fn create_org_repo(
        &self,
        orgname: &str,
        new_repo: &NewRepository<'_>,
    ) -> Result<Repository> {
        let url = self.make_url(&["orgs", orgname, "repos"], &[])?;
        let request = self.request(Method::POST, url).json(new_repo);
        match self.send(request).await {
            Ok(response) => Ok(response.json().await?),
            Err(Error::UnexpectedStatus { status, message })
                if status == StatusCode::UNPROCESSABLE_ENTITY
                    && message.to_lowercase().contains("name already exists") =>
            {
                Err(Error::AlreadyExists(format!("{orgname}/{}", new_repo.name)))
            }
            Err(e) => Err(e),
        }
    }

    /// Add `username` as a collaborator on a repository with the given permission, one of
    /// `pull`, `triage`, `push`, `maintain`, or `admin`.
    pub async fn add_collaborator(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
        permission: &str,
    ) -> Result<CollaboratorStatus> {
        let url = self.make_url(&["repos", owner, repo, "collaborators", username], &[])?;
        let request = self
            .request(Method::PUT, url)
            .json(&CollaboratorPermission { permission });
        let response = self.send(request).await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(CollaboratorStatus::AlreadyCollaborator),
            _ => Ok(CollaboratorStatus::Invited),
        }
    }

    /// Create a file with the given contents at `path` on the default branch of a repository.
    ///
    /// `path` is relative to the repository root and may contain slashes.
    pub async fn create_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        message: &str,
        content: &[u8],
    ) -> Result<()> {
        let mut parts = vec!["repos", owner, repo, "contents"];
        parts.extend(split_repo_path(path)?);
        let url = self.make_url(&parts, &[])?;
        let body = NewFileContents {
            message,
            content: base64::engine::general_purpose::STANDARD.encode(content),
        };
        let request = self.request(Method::PUT, url).json(&body);
        self.send(request).await?;
        Ok(())
    }

    pub async fn get_org_repos(&self, orgname: &str) -> Result<Page<Repository>> {
        let response = self
            .get(&["orgs", orgname, "repos"], &[MAX_PER_PAGE, ("type", "all")])
            .await?;
        Page::from_response(response).await
    }

    pub async fn next_page<T>(&self, page: Page<T>) -> Result<Option<Page<T>>>
    where
        T: serde::de::DeserializeOwned,
    {
        self.next_page_inner(page.next).await
    }

    async fn next_page_inner<T>(&self, next: Option<Url>) -> Result<Option<Page<T>>>
    where
        T: serde::de::DeserializeOwned,
    {
        match next {
            Some(next) => {
                let response = self.send(self.request(Method::GET, next)).await?;
                Ok(Some(Page::from_response(response).await?))
            }
            None => Ok(None),
        }
    }

    pub async fn get_all<T>(&self, page: Page<T>) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut results = Vec::new();
        let mut next_page = Some(page);
        while let Some(page) = next_page {
            results.extend(page.items);
            next_page = self.next_page_inner(page.next).await?;
        }
        Ok(results)
    }
}

/// Create a URL from the given base, path parts, and parameters.
///
/// The path parts should not contain slashes.
fn url_from_path_parts_and_params(
    base_url: Url,
    path_parts: &[&str],
    params: &[(&str, &str)],
) -> Result<Url> {
    if base_url.cannot_be_a_base() {
        return Err(Error::UrlBaseError(base_url));
    }

    let mut url = base_url.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| Error::UrlBaseError(base_url))?;
        segments.pop_if_empty();
        for p in path_parts {
            if p.contains('/') {
                return Err(Error::UrlSlashError(p.to_string()));
            }
            segments.push(p);
        }
    }
    if path_parts.is_empty() && !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    url.set_query(None);
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

/// Split a path within a repository into URL path parts.
fn split_repo_path(path: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() || parts.iter().any(|p| *p == "." || *p == "..") {
        return Err(Error::InvalidPath(path.to_string()));
    }
    Ok(parts)
}


// private implementation
impl Client {
    /// Construct a `Url` from the given path parts and query parameters.
    fn make_url(&self, path_parts: &[&str], params: &[(&str, &str)]) -> Result<Url> {
        url_from_path_parts_and_params(self.base_url.clone(), path_parts, params)
    }

    async fn get(&self, path_parts: &[&str], params: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = self.make_url(path_parts, params)?;
        self.send(self.request(Method::GET, url)).await
    }

    /// Build a request with the GitHub REST headers and authentication, if any.
    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let request_builder = self
            .inner
            .request(method, url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.auth {
            Auth::PersonalAccessToken(token) => request_builder.bearer_auth(token.expose_secret()),
            Auth::Unauthenticated => request_builder,
        }
    }

    /// Send a request, honoring the rate limit policy, and turn error responses into `Error`s.
    async fn send(&self, request_builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        self.pacer.wait_turn().await;

        let response = request_builder.send().await?;
        let status = response.status();
        debug!("{} {}", status, response.url());

        if status.is_success() {
            return Ok(response);
        }

        // Check for rate limiting.
        //
        // GitHub signals primary rate limits with a 403 or 429 and `x-ratelimit-remaining: 0`,
        // and secondary rate limits with a `Retry-After` header giving a number of seconds.
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(wait) = rate_limit_wait(response.headers()) {
                let text = response.text().await?;
                let client_error = serde_json::from_str(&text).unwrap_or(ClientError {
                    message: text,
                    documentation_url: None,
                    errors: None,
                });
                return Err(Error::RateLimited { client_error, wait });
            }
        }

        let text = response.text().await?;
        let message = match serde_json::from_str::<ClientError>(&text) {
            Ok(client_error) => client_error.summary(),
            Err(_) => text,
        };
        Err(Error::UnexpectedStatus { status, message })
    }
}

/// If the headers indicate rate limiting, how long to wait before trying again (when known).
fn rate_limit_wait(headers: &header::HeaderMap) -> Option<Option<Duration>> {
    if let Some(retry_after) = headers.get(header::RETRY_AFTER) {
        let wait = atoi::atoi::<i64>(retry_after.as_bytes()).and_then(TimeDelta::try_seconds);
        return Some(wait);
    }

    if let Some(b"0") = headers
        .get("x-ratelimit-remaining")
        .map(HeaderValue::as_bytes)
    {
        let wait = || -> Option<Duration> {
            let date = headers.get(header::DATE)?.to_str().ok()?;
            let date = DateTime::parse_from_rfc2822(date).ok()?.with_timezone(&Utc);

            let reset_time = headers
                .get("x-ratelimit-reset")?
                .to_str()
                .ok()?
                .parse::<i64>()
                .ok()?;
            let reset_time = Utc.timestamp_opt(reset_time, 0).single()?;

            Some(reset_time - date)
        }();
        return Some(wait);
    }

    None
}
