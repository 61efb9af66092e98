mod auth;
mod client;
mod client_builder;
mod error;
pub mod models;
mod rate_limit;
mod repo_enumerator;
mod result;

pub use auth::Auth;
pub use client::Client;
pub use client_builder::{ClientBuilder, TOKEN_ENV_VARS};
pub use error::Error;
pub use models::{CollaboratorStatus, NewRepository, Repository};
pub use rate_limit::RateLimitPolicy;
pub use repo_enumerator::{RepoEnumerator, RepoFilter, Visibility};
pub use result::Result;

pub use reqwest::StatusCode;

/// Create the single-threaded async runtime that drives GitHub requests.
///
/// The command-line drivers are sequential, so one runtime per invocation is used with `block_on`.
pub fn new_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Log advice about a rate-limiting error, if `err` is one.
pub fn warn_if_rate_limited(err: &Error, client: &Client) {
    use tracing::warn;

    if let Error::RateLimited { wait, .. } = err {
        let suggestion = if client.is_authenticated() {
            ""
        } else {
            "; consider supplying a GitHub personal access token through the GITHUB_TOKEN environment variable"
        };
        match wait {
            Some(wait) => warn!(
                "Rate limit exceeded: must wait for {}s before retrying{suggestion}",
                wait.num_seconds()
            ),
            None => warn!("Rate limit exceeded{suggestion}"),
        }
    }
}

/// List the repositories of an organization that pass `filter`.
///
/// This is a high-level wrapper that handles the details of creating an async runtime and checking
/// connectivity before paging through the listing.
pub fn list_org_repos(
    client: &Client,
    orgname: &str,
    filter: &RepoFilter,
) -> anyhow::Result<Vec<Repository>> {
    use anyhow::{bail, Context};
    use tracing::debug;

    let runtime = new_runtime().context("Failed to initialize async runtime")?;

    let result = runtime.block_on(async {
        // Get rate limit first thing.
        // If there are connectivity issues, this is likely to reveal them quickly.
        let rate_limit = client.get_rate_limit().await?;
        debug!("GitHub rate limits: {:?}", rate_limit.rate);

        RepoEnumerator::new(client)
            .enumerate_filtered(orgname, filter)
            .await
    });

    match result {
        Ok(repos) => Ok(repos),
        Err(err) => {
            warn_if_rate_limited(&err, client);
            bail!(err);
        }
    }
}
