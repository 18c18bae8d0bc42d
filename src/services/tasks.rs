use std::sync::Arc;

use chrono::Utc;

use super::authorization::{
    can_delete_task, can_mutate_task, can_view_task, resolve_task_owner_for_create, scope_task_listing,
    ListingScope, OwnerChange,
};
use super::store::{TaskStore, UserStore};
use crate::errors::{AppError, AppResult};
use crate::models::{Page, Principal, Task, TaskDraft, TaskPageRequest, TaskStatus, TaskView};

/// Task lifecycle. Each mutation loads the task, consults the access rules, then writes.
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    users: Arc<dyn UserStore>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskStore>, users: Arc<dyn UserStore>) -> Self {
        Self { tasks, users }
    }

    async fn load(&self, id: &str) -> AppResult<Task> {
        self.tasks.find_by_id(id).await?.ok_or_else(|| {
            tracing::warn!("Task not found with id: {}", id);
            AppError::TaskNotFound
        })
    }

    async fn require_user(&self, id: &str) -> AppResult<()> {
        match self.users.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => {
                tracing::warn!("User not found with id: {}", id);
                Err(AppError::UserNotFound)
            }
        }
    }

    pub async fn list(
        &self,
        principal: &Principal,
        status: Option<TaskStatus>,
        request: TaskPageRequest,
    ) -> AppResult<Page<TaskView>> {
        let scope = scope_task_listing(principal);
        let page = match (&scope, status) {
            (ListingScope::All, None) => self.tasks.find_all(request).await?,
            (ListingScope::All, Some(status)) => self.tasks.find_by_status(status, request).await?,
            (ListingScope::OwnedBy(owner), None) => self.tasks.find_by_owner(owner, request).await?,
            (ListingScope::OwnedBy(owner), Some(status)) => {
                self.tasks.find_by_owner_and_status(owner, status, request).await?
            }
        };

        tracing::info!(
            "Fetched tasks for '{}': page={}, totalItems={}, totalPages={}",
            principal.id,
            page.page,
            page.total_items,
            page.total_pages
        );
        Ok(page.map(|t| t.view()))
    }

    pub async fn get(&self, principal: &Principal, id: &str) -> AppResult<TaskView> {
        let task = self.load(id).await?;
        if !can_view_task(principal, &task) {
            tracing::warn!("Unauthorized read attempt by user {} for task {}", principal.id, id);
            return Err(AppError::forbidden(format!("user {} does not own task {}", principal.id, id)));
        }
        Ok(task.view())
    }

    pub async fn create(&self, principal: &Principal, draft: TaskDraft) -> AppResult<TaskView> {
        let owner_id = resolve_task_owner_for_create(principal, draft.owner_id.as_deref()).map_err(|e| {
            tracing::warn!("User {} may not create task for {:?}: {}", principal.id, draft.owner_id, e);
            e
        })?;
        self.require_user(&owner_id).await?;

        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: draft.title,
            description: draft.description,
            status: draft.status,
            created_at: Utc::now(),
            updated_at: None,
            deadline: draft.deadline,
            owner_id,
        };
        let task = self.tasks.save(task).await?;
        tracing::info!("Task {} created for user {} by {}", task.id, task.owner_id, principal.id);

        Ok(task.view())
    }

    pub async fn update(&self, principal: &Principal, id: &str, draft: TaskDraft) -> AppResult<TaskView> {
        let mut task = self.load(id).await?;

        let change = can_mutate_task(principal, &task, draft.owner_id.as_deref()).map_err(|e| {
            tracing::warn!("Unauthorized update attempt by user {} for task {}", principal.id, id);
            e
        })?;
        if let OwnerChange::Reassign(new_owner) = change {
            self.require_user(&new_owner).await?;
            tracing::info!("Admin {} reassigned task {} from {} to {}", principal.id, id, task.owner_id, new_owner);
            task.owner_id = new_owner;
        }

        task.title = draft.title;
        task.description = draft.description;
        task.deadline = draft.deadline;
        task.status = draft.status;
        task.updated_at = Some(Utc::now());

        let task = self.tasks.save(task).await?;
        tracing::info!("Task {} updated by user {}", id, principal.id);

        Ok(task.view())
    }

    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<()> {
        let task = self.load(id).await?;
        if !can_delete_task(principal, &task) {
            tracing::warn!("Unauthorized delete attempt by user {} for task {}", principal.id, id);
            return Err(AppError::forbidden(format!("user {} does not own task {}", principal.id, id)));
        }

        self.tasks.delete(&task).await?;
        tracing::info!("Task {} deleted by user {}", id, principal.id);
        Ok(())
    }
}
