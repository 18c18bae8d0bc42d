//! Access rules for users and tasks.
//!
//! Every function here is a pure decision over the acting [`Principal`] and the
//! state of the target resource. Services load the resource, ask this module,
//! and only then write.

use crate::errors::{AppError, AppResult};
use crate::models::{Principal, Role, SortDirection, SortField, Task, TaskSort, UserView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewUser,
    MutateUser,
    ManageUsers,
    ViewTask,
    DeleteTask,
}

/// `owner_id` is the user the target belongs to (the user itself for user actions).
pub fn permits(principal: &Principal, action: Action, owner_id: &str) -> bool {
    match (principal.role, action) {
        (Role::Admin, _) => true,
        (Role::User, Action::ManageUsers) => false,
        (Role::User, Action::ViewUser | Action::MutateUser | Action::ViewTask | Action::DeleteTask) => {
            principal.id == owner_id
        }
    }
}

pub fn can_view_user(principal: &Principal, target_user_id: &str) -> bool {
    permits(principal, Action::ViewUser, target_user_id)
}

pub fn can_mutate_user(principal: &Principal, target_user_id: &str) -> bool {
    permits(principal, Action::MutateUser, target_user_id)
}

pub fn can_manage_users(principal: &Principal) -> bool {
    permits(principal, Action::ManageUsers, "")
}

/// Only admins see roles. Applies to self-views as well.
pub fn effective_role_visibility(principal: &Principal, user: UserView) -> UserView {
    match principal.role {
        Role::Admin => user,
        Role::User => user.without_role(),
    }
}

pub fn resolve_task_owner_for_create(principal: &Principal, requested_owner_id: Option<&str>) -> AppResult<String> {
    match (principal.role, requested_owner_id) {
        (Role::Admin, Some(owner_id)) => Ok(owner_id.to_string()),
        (Role::Admin, None) => Err(AppError::OwnerRequired),
        (Role::User, Some(owner_id)) if owner_id != principal.id => Err(AppError::forbidden(format!(
            "user {} may not create tasks for {}",
            principal.id, owner_id
        ))),
        (Role::User, _) => Ok(principal.id.clone()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerChange {
    Keep,
    /// Admin-only; the caller must check the new owner exists.
    Reassign(String),
}

pub fn can_mutate_task(principal: &Principal, task: &Task, requested_owner_id: Option<&str>) -> AppResult<OwnerChange> {
    match principal.role {
        Role::Admin => Ok(match requested_owner_id {
            Some(owner_id) if owner_id != task.owner_id => OwnerChange::Reassign(owner_id.to_string()),
            _ => OwnerChange::Keep,
        }),
        Role::User => {
            if let Some(owner_id) = requested_owner_id {
                if owner_id != principal.id {
                    return Err(AppError::forbidden(format!(
                        "user {} may not assign task {} to {}",
                        principal.id, task.id, owner_id
                    )));
                }
            }
            if task.owner_id != principal.id {
                return Err(AppError::forbidden(format!(
                    "user {} does not own task {}",
                    principal.id, task.id
                )));
            }
            Ok(OwnerChange::Keep)
        }
    }
}

pub fn can_view_task(principal: &Principal, task: &Task) -> bool {
    permits(principal, Action::ViewTask, &task.owner_id)
}

pub fn can_delete_task(principal: &Principal, task: &Task) -> bool {
    permits(principal, Action::DeleteTask, &task.owner_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingScope {
    All,
    OwnedBy(String),
}

pub fn scope_task_listing(principal: &Principal) -> ListingScope {
    match principal.role {
        Role::Admin => ListingScope::All,
        Role::User => ListingScope::OwnedBy(principal.id.clone()),
    }
}

/// Unknown sort keys fall back to creation time; anything but "asc" sorts descending.
pub fn listing_sort(sort_by: Option<&str>, direction: Option<&str>) -> TaskSort {
    let field = match sort_by.map(str::trim) {
        None | Some("") | Some("created") | Some("createdAt") => SortField::CreatedAt,
        Some("deadline") => SortField::Deadline,
        Some(other) => {
            tracing::warn!("Invalid sort field '{}'. Defaulting to 'created'.", other);
            SortField::CreatedAt
        }
    };

    let direction = match direction {
        Some(d) if d.trim().eq_ignore_ascii_case("asc") => SortDirection::Asc,
        _ => SortDirection::Desc,
    };

    TaskSort { field, direction }
}
