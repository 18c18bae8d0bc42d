use std::sync::Arc;

use crate::config::AuthConfig;
use crate::middleware::PrincipalResolver;
use crate::services::{AccountService, PasswordHasher, TaskService, TaskStore, TokenService, UserService, UserStore};

/// Application state shared between handlers. Everything inside is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub users: UserService,
    pub tasks: TaskService,
    pub resolver: PrincipalResolver,
}

impl AppState {
    pub fn new(auth: &AuthConfig, users: Arc<dyn UserStore>, tasks: Arc<dyn TaskStore>) -> Self {
        let tokens = Arc::new(TokenService::from_config(auth));
        let hasher = PasswordHasher::new(auth.bcrypt_cost);

        Self {
            accounts: AccountService::new(users.clone(), hasher, tokens.clone()),
            users: UserService::new(users.clone(), tasks.clone(), hasher),
            tasks: TaskService::new(tasks, users),
            resolver: PrincipalResolver::new(tokens),
        }
    }
}
