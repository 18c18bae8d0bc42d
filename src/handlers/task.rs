use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use axum_extra::extract::WithRejection;

use crate::errors::{AppError, AppResult};
use crate::models::{ApiResponse, ListTasksQuery, Page, Principal, TaskForm, TaskPageRequest, TaskView};
use crate::services::authorization::listing_sort;
use crate::state::AppState;

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    WithRejection(Query(query), _): WithRejection<Query<ListTasksQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Page<TaskView>>>> {
    let request = TaskPageRequest {
        page: query.page_request()?,
        sort: listing_sort(query.sort_by.as_deref(), query.direction.as_deref()),
    };
    let tasks = state.tasks.list(&principal, query.status()?, request).await?;
    Ok(Json(ApiResponse::ok(tasks)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<TaskView>>> {
    let task = state.tasks.get(&principal, &id).await?;
    Ok(Json(ApiResponse::ok(task)))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    WithRejection(Json(form), _): WithRejection<Json<TaskForm>, AppError>,
) -> AppResult<Json<ApiResponse<TaskView>>> {
    let task = state.tasks.create(&principal, form.validate()?).await?;
    Ok(Json(ApiResponse::ok(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    WithRejection(Json(form), _): WithRejection<Json<TaskForm>, AppError>,
) -> AppResult<Json<ApiResponse<TaskView>>> {
    let task = state.tasks.update(&principal, &id, form.validate()?).await?;
    Ok(Json(ApiResponse::ok(task)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.tasks.delete(&principal, &id).await?;
    Ok(Json(ApiResponse::empty()))
}
