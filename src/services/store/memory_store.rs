use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{page_tasks, page_users, TaskStore, UserStore};
use crate::errors::{AppError, AppResult};
use crate::models::{Page, PageRequest, Task, TaskPageRequest, TaskStatus, User};

/// Process-local store for tests and single-node runs without Redis.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    tasks: RwLock<HashMap<String, Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn save(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username && u.id != user.id) {
            return Err(AppError::UsernameTaken(user.username));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn delete(&self, user: &User) -> AppResult<()> {
        self.users.write().await.remove(&user.id);
        Ok(())
    }

    async fn find_all_order_by_created_desc(&self, page: PageRequest) -> AppResult<Page<User>> {
        let users = self.users.read().await.values().cloned().collect();
        Ok(page_users(users, page))
    }
}

impl MemoryStore {
    async fn tasks_matching(&self, owner_id: Option<&str>) -> Vec<Task> {
        self.tasks
            .read()
            .await
            .values()
            .filter(|t| owner_id.map_or(true, |owner| t.owner_id == owner))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Task>> {
        Ok(self.tasks.read().await.get(id).cloned())
    }

    async fn save(&self, task: Task) -> AppResult<Task> {
        self.tasks.write().await.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn delete(&self, task: &Task) -> AppResult<()> {
        self.tasks.write().await.remove(&task.id);
        Ok(())
    }

    async fn delete_by_owner(&self, owner_id: &str) -> AppResult<usize> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, t| t.owner_id != owner_id);
        Ok(before - tasks.len())
    }

    async fn find_by_owner(&self, owner_id: &str, request: TaskPageRequest) -> AppResult<Page<Task>> {
        Ok(page_tasks(self.tasks_matching(Some(owner_id)).await, None, request))
    }

    async fn find_by_owner_and_status(
        &self,
        owner_id: &str,
        status: TaskStatus,
        request: TaskPageRequest,
    ) -> AppResult<Page<Task>> {
        Ok(page_tasks(self.tasks_matching(Some(owner_id)).await, Some(status), request))
    }

    async fn find_by_status(&self, status: TaskStatus, request: TaskPageRequest) -> AppResult<Page<Task>> {
        Ok(page_tasks(self.tasks_matching(None).await, Some(status), request))
    }

    async fn find_all(&self, request: TaskPageRequest) -> AppResult<Page<Task>> {
        Ok(page_tasks(self.tasks_matching(None).await, None, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, SortDirection, SortField, TaskSort};
    use chrono::{Duration, Utc};

    fn task(id: &str, owner: &str, status: TaskStatus, deadline_days: i64) -> Task {
        Task {
            id: id.into(),
            title: format!("task {}", id),
            description: None,
            status,
            created_at: Utc::now(),
            updated_at: None,
            deadline: Utc::now() + Duration::days(deadline_days),
            owner_id: owner.into(),
        }
    }

    fn request(field: SortField, direction: SortDirection) -> TaskPageRequest {
        TaskPageRequest { page: PageRequest::new(0, 10), sort: TaskSort { field, direction } }
    }

    #[tokio::test]
    async fn test_username_uniqueness() {
        let store = MemoryStore::new();
        let alice = User::new("alice".into(), "h".into(), None, Role::User);
        UserStore::save(&store, alice.clone()).await.unwrap();

        // re-saving the same user is an update
        UserStore::save(&store, alice).await.unwrap();

        let impostor = User::new("alice".into(), "h".into(), None, Role::User);
        let result = UserStore::save(&store, impostor).await;
        assert!(matches!(result, Err(AppError::UsernameTaken(_))));
    }

    #[tokio::test]
    async fn test_owner_and_status_filters() {
        let store = MemoryStore::new();
        TaskStore::save(&store, task("t1", "U1", TaskStatus::Pending, 3)).await.unwrap();
        TaskStore::save(&store, task("t2", "U1", TaskStatus::Completed, 1)).await.unwrap();
        TaskStore::save(&store, task("t3", "U2", TaskStatus::Pending, 2)).await.unwrap();

        let req = request(SortField::Deadline, SortDirection::Asc);
        let owned = store.find_by_owner("U1", req).await.unwrap();
        let ids: Vec<_> = owned.items.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t1"]);

        let pending = store.find_by_status(TaskStatus::Pending, req).await.unwrap();
        assert_eq!(pending.total_items, 2);

        let owned_pending = store.find_by_owner_and_status("U1", TaskStatus::Pending, req).await.unwrap();
        assert_eq!(owned_pending.items.len(), 1);
        assert_eq!(owned_pending.items[0].id, "t1");

        let all = store.find_all(request(SortField::Deadline, SortDirection::Desc)).await.unwrap();
        let ids: Vec<_> = all.items.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t3", "t2"]);
    }

    #[tokio::test]
    async fn test_delete_by_owner() {
        let store = MemoryStore::new();
        TaskStore::save(&store, task("t1", "U1", TaskStatus::Pending, 1)).await.unwrap();
        TaskStore::save(&store, task("t2", "U1", TaskStatus::Pending, 1)).await.unwrap();
        TaskStore::save(&store, task("t3", "U2", TaskStatus::Pending, 1)).await.unwrap();

        assert_eq!(store.delete_by_owner("U1").await.unwrap(), 2);
        assert!(TaskStore::find_by_id(&store, "t3").await.unwrap().is_some());
        assert!(TaskStore::find_by_id(&store, "t1").await.unwrap().is_none());
    }
}
