// Application error type shared by services and handlers.
use thiserror::Error;

pub mod response;
pub mod token;

pub use token::{TokenError, TokenResult};

use crate::validation::FieldError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    #[error("Authentication error: {0}")]
    Unauthenticated(#[from] TokenError),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Task not found")]
    TaskNotFound,

    #[error("Password incorrect")]
    PasswordIncorrect,

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Owner user id is required")]
    OwnerRequired,

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        AppError::Forbidden(reason.into())
    }

    /// Numeric code and client-facing message for the response envelope.
    pub fn code(&self) -> (u16, &'static str) {
        match self {
            AppError::UserNotFound => (1001, "User not found"),
            AppError::PasswordIncorrect => (1002, "Password incorrect"),
            AppError::UsernameTaken(_) => (1003, "Username already exists"),
            AppError::Unauthenticated(_) => (2001, "Unauthenticated"),
            AppError::Forbidden(_) => (2003, "Unauthorized"),
            AppError::OwnerRequired => (3001, "User ID is required."),
            AppError::TaskNotFound => (3002, "Task not found"),
            AppError::Validation(_) => (400, "Invalid request data"),
            AppError::Redis(_)
            | AppError::Serialization(_)
            | AppError::Hashing(_)
            | AppError::Internal(_) => (500, "Internal server error. Please try again later."),
        }
    }
}

// Custom result type
pub type AppResult<T> = Result<T, AppError>;
