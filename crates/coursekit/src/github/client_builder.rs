use reqwest::{IntoUrl, Url};
use std::time::Duration;
use tracing::debug;

use super::rate_limit::Pacer;
use super::{Auth, Client, Error, RateLimitPolicy, Result};

/// Environment variables consulted for a personal access token, in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

// -------------------------------------------------------------------------------------------------
// ClientBuilder
// -------------------------------------------------------------------------------------------------
pub struct ClientBuilder {
    base_url: reqwest::Url,
    auth: Auth,
    token_env_var: Option<&'static str>,
    rate_limit: RateLimitPolicy,
    timeout: Duration,
}

impl ClientBuilder {
    /// The user agent string sent when accessing the GitHub REST API
    const USER_AGENT: &'static str = "coursekit";

    /// Create a new `ClientBuilder` that uses unauthenticated, unpaced access to
    /// <https://api.github.com>.
    pub fn new() -> Self {
        ClientBuilder {
            base_url: Url::parse("https://api.github.com").expect("default base URL should parse"),
            auth: Auth::Unauthenticated,
            token_env_var: None,
            rate_limit: RateLimitPolicy::Unlimited,
            timeout: Duration::from_secs(20),
        }
    }

    /// Use the specified base URL.
    pub fn base_url<T: IntoUrl>(mut self, url: T) -> Result<Self> {
        self.base_url = url.into_url()?;
        Ok(self)
    }

    /// Use the given authentication mechanism.
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self.token_env_var = None;
        self
    }

    /// Space out requests according to the given policy.
    pub fn rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = policy;
        self
    }

    /// Give up on any single request after this long.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load an optional personal access token from the `GITHUB_TOKEN` environment variable, falling
    /// back to `GH_TOKEN`. If neither is set, unauthenticated access is used.
    pub fn personal_access_token_from_env(mut self) -> Result<Self> {
        for env_var_name in TOKEN_ENV_VARS {
            match std::env::var(env_var_name) {
                Err(std::env::VarError::NotPresent) => continue,
                Err(std::env::VarError::NotUnicode(_s)) => {
                    return Err(Error::InvalidTokenEnvVar(env_var_name.to_string()));
                }
                Ok(val) if val.trim().is_empty() => continue,
                Ok(val) => {
                    debug!(
                        "Using GitHub personal access token from {env_var_name} environment variable"
                    );
                    self.auth = Auth::PersonalAccessToken(secrecy::SecretString::from(val));
                    self.token_env_var = Some(env_var_name);
                    return Ok(self);
                }
            }
        }
        debug!("No GitHub access token provided; using unauthenticated API access.");
        Ok(self)
    }

    /// Build a `Client` from this `ClientBuilder`.
    pub fn build(self) -> Result<Client> {
        let inner = reqwest::ClientBuilder::new()
            .user_agent(Self::USER_AGENT)
            .timeout(self.timeout)
            .build()?;
        Ok(Client {
            base_url: self.base_url,
            auth: self.auth,
            token_env_var: self.token_env_var,
            inner,
            pacer: Pacer::new(self.rate_limit),
        })
    }
}

impl Default for ClientBuilder {
    /// Equivalent to `ClientBuilder::new()`.
    fn default() -> Self {
        Self::new()
    }
}
