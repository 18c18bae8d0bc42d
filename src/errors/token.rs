use thiserror::Error;

/// Why a bearer token was refused. Collapsed to `Unauthenticated` at the boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is missing")]
    Missing,

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token signature is invalid")]
    BadSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

pub type TokenResult<T> = Result<T, TokenError>;
