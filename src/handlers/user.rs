use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use axum_extra::extract::WithRejection;

use crate::errors::{AppError, AppResult};
use crate::models::{ApiResponse, Page, PageQuery, Principal, UserForm, UserView};
use crate::state::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Page<UserView>>>> {
    let users = state.users.list(&principal, query.validate()?).await?;
    Ok(Json(ApiResponse::ok(users)))
}

// Shared by /api/admin/users/:id and /api/user/:id; the service applies self-or-admin.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = state.users.find_by_id(&principal, &id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    WithRejection(Json(form), _): WithRejection<Json<UserForm>, AppError>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = state.users.create(&principal, form.validate_new()?).await?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    WithRejection(Json(form), _): WithRejection<Json<UserForm>, AppError>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = state.users.update(&principal, &id, form.validate_changes()?).await?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.users.delete(&principal, &id).await?;
    Ok(Json(ApiResponse::empty()))
}
