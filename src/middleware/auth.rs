use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::errors::{AppError, AppResult, TokenError};
use crate::models::Principal;
use crate::services::TokenService;
use crate::state::AppState;

/// Turns a raw bearer token into the request's [`Principal`].
#[derive(Clone)]
pub struct PrincipalResolver {
    tokens: Arc<TokenService>,
}

impl PrincipalResolver {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    pub fn resolve(&self, raw_token: Option<&str>) -> AppResult<Principal> {
        let token = raw_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(TokenError::Missing)?;

        self.tokens.verify(token).map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            AppError::Unauthenticated(e)
        })
    }
}

/// Resolves the principal and stores it in the request extensions for handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = state.resolver.resolve(bearer.as_ref().map(|h| h.0.token()))?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Must run after `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    match req.extensions().get::<Principal>() {
        Some(principal) if principal.is_admin() => Ok(next.run(req).await),
        Some(principal) => {
            tracing::warn!("User {} denied access to {}", principal.id, req.uri().path());
            Err(AppError::forbidden("admin role required"))
        }
        None => Err(AppError::Unauthenticated(TokenError::Missing)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn resolver(ttl_seconds: i64) -> (PrincipalResolver, Arc<TokenService>) {
        let tokens = Arc::new(TokenService::new("resolver_secret", ttl_seconds));
        (PrincipalResolver::new(tokens.clone()), tokens)
    }

    #[test]
    fn test_resolves_valid_token() {
        let (resolver, tokens) = resolver(60);
        let principal = Principal::new("U1", Role::User);
        let token = tokens.issue(&principal).unwrap();

        assert_eq!(resolver.resolve(Some(&token)).unwrap(), principal);
    }

    #[test]
    fn test_missing_or_blank_token() {
        let (resolver, _) = resolver(60);

        for raw in [None, Some(""), Some("   ")] {
            assert!(matches!(
                resolver.resolve(raw),
                Err(AppError::Unauthenticated(TokenError::Missing))
            ));
        }
    }

    #[test]
    fn test_expired_and_garbage_tokens() {
        let (expired_resolver, tokens) = resolver(-5);
        let token = tokens.issue(&Principal::new("U1", Role::User)).unwrap();
        assert!(matches!(
            expired_resolver.resolve(Some(&token)),
            Err(AppError::Unauthenticated(TokenError::Expired))
        ));

        assert!(matches!(
            expired_resolver.resolve(Some("garbage")),
            Err(AppError::Unauthenticated(TokenError::Malformed(_)))
        ));
    }
}
