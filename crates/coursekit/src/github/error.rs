use chrono::Duration;
use reqwest::StatusCode;
use url::Url;

use super::models;

// -------------------------------------------------------------------------------------------------
// Error
// -------------------------------------------------------------------------------------------------
#[derive(Debug)]
pub enum Error {
    RateLimited {
        /// The client error returned by GitHub
        client_error: models::ClientError,

        /// The duration to wait until trying again
        wait: Option<Duration>,
    },

    /// A repository with the requested name already exists
    AlreadyExists(String),

    /// GitHub answered with a status the operation does not expect
    UnexpectedStatus { status: StatusCode, message: String },

    UrlBaseError(Url),
    UrlParseError(url::ParseError),
    UrlSlashError(String),
    InvalidPath(String),
    ReqwestError(reqwest::Error),
    InvalidTokenEnvVar(String),
}

impl Error {
    /// The HTTP status GitHub answered with, if this error came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            Error::ReqwestError(e) => e.status(),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::RateLimited { client_error, wait } => {
                write!(f, "request was rate-limited: {}", client_error.message)?;
                if let Some(wait) = wait {
                    write!(f, " (retry in {}s)", wait.num_seconds())?;
                }
                Ok(())
            }
            Error::AlreadyExists(name) => write!(f, "repository {name:?} already exists"),
            Error::UnexpectedStatus { status, message } => {
                write!(f, "unexpected response {status}: {message}")
            }
            Error::UrlBaseError(u) => write!(f, "invalid base URL: {u}"),
            Error::UrlParseError(e) => write!(f, "error parsing URL: {e}"),
            Error::UrlSlashError(p) => {
                write!(f, "error building URL: component {p:?} contains a slash")
            }
            Error::InvalidPath(p) => write!(f, "invalid repository path {p:?}"),
            Error::ReqwestError(e) => write!(f, "error making request: {e}"),
            Error::InvalidTokenEnvVar(v) => {
                write!(f, "error loading token: ill-formed value of {v} environment variable")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UrlParseError(e) => Some(e),
            Error::ReqwestError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::UrlParseError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::ReqwestError(err)
    }
}
