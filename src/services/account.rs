use std::sync::Arc;

use serde::Serialize;

use super::password::PasswordHasher;
use super::store::UserStore;
use super::token::TokenService;
use crate::errors::{AppError, AppResult};
use crate::models::{Credentials, NewAccount, Principal, Role, User, UserView};

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Registration and login.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher, tokens: Arc<TokenService>) -> Self {
        Self { users, hasher, tokens }
    }

    /// Role is only disclosed in the response when the new account is an admin.
    pub async fn register(&self, account: NewAccount) -> AppResult<UserView> {
        if self.users.find_by_username(&account.username).await?.is_some() {
            tracing::warn!("Attempt to register with existing username: {}", account.username);
            return Err(AppError::UsernameTaken(account.username));
        }

        let password_hash = self.hasher.hash_blocking(account.password).await?;
        let user = User::new(account.username, password_hash, account.full_name, account.role);
        let user = self.users.save(user).await?;
        tracing::info!("Registered new user: {}, role: {}", user.username, user.role);

        let view = user.view();
        Ok(match user.role {
            Role::Admin => view,
            Role::User => view.without_role(),
        })
    }

    pub async fn login(&self, credentials: Credentials) -> AppResult<LoginResponse> {
        let user = self
            .users
            .find_by_username(&credentials.username)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !self
            .hasher
            .verify_blocking(credentials.password, user.password_hash.clone())
            .await?
        {
            tracing::warn!("Incorrect password for user: {}", user.username);
            return Err(AppError::PasswordIncorrect);
        }

        let token = self
            .tokens
            .issue(&Principal::new(user.id.clone(), user.role))
            .map_err(|e| AppError::Internal(e.to_string()))?;
        tracing::info!("Issued token for user: {}", user.username);
        Ok(LoginResponse { token })
    }
}
