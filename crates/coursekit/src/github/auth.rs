use secrecy::SecretString;

// -------------------------------------------------------------------------------------------------
// Auth
// -------------------------------------------------------------------------------------------------
/// Supported forms of authentication
pub enum Auth {
    /// No authentication; only public resources can be read, and nothing can be created
    Unauthenticated,

    /// Authenticate with a GitHub personal access token that has `repo` scope
    PersonalAccessToken(SecretString),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Unauthenticated => write!(f, "Unauthenticated"),
            Auth::PersonalAccessToken(_) => write!(f, "PersonalAccessToken(<redacted>)"),
        }
    }
}
