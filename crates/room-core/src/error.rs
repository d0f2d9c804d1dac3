use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("no decoder for {format} asset {path}")]
    UnsupportedFormat { path: String, format: &'static str },
    #[error("failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },
    #[error("failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("{path} contains no scene")]
    EmptyScene { path: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization code received but no code verifier was stored")]
    MissingVerifier,
    #[error("token endpoint rejected the request ({status}): {message}")]
    TokenRejected { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("not logged in")]
    NotLoggedIn,
}
