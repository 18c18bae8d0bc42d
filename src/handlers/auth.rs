use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;

use crate::errors::{AppError, AppResult};
use crate::models::{ApiResponse, LoginForm, RegisterForm, UserView};
use crate::services::LoginResponse;
use crate::state::AppState;

pub async fn handle_register(
    State(state): State<AppState>,
    WithRejection(Json(form), _): WithRejection<Json<RegisterForm>, AppError>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    tracing::info!("Registration attempt for user: {:?}", form.username);
    let user = state.accounts.register(form.validate()?).await?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn handle_login(
    State(state): State<AppState>,
    WithRejection(Json(form), _): WithRejection<Json<LoginForm>, AppError>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    tracing::info!("Login attempt for user: {:?}", form.username);
    let token = state.accounts.login(form.validate()?).await?;
    Ok(Json(ApiResponse::ok(token)))
}
