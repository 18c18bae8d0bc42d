use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::{Page, PageRequest, Task, TaskPageRequest, TaskStatus, User};

mod memory_store;
mod redis_store;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;

    /// Inserts or replaces. Fails with `UsernameTaken` if another user holds the username.
    async fn save(&self, user: User) -> AppResult<User>;

    async fn delete(&self, user: &User) -> AppResult<()>;

    async fn find_all_order_by_created_desc(&self, page: PageRequest) -> AppResult<Page<User>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Task>>;

    async fn save(&self, task: Task) -> AppResult<Task>;

    async fn delete(&self, task: &Task) -> AppResult<()>;

    /// Returns how many tasks were removed.
    async fn delete_by_owner(&self, owner_id: &str) -> AppResult<usize>;

    async fn find_by_owner(&self, owner_id: &str, request: TaskPageRequest) -> AppResult<Page<Task>>;

    async fn find_by_owner_and_status(
        &self,
        owner_id: &str,
        status: TaskStatus,
        request: TaskPageRequest,
    ) -> AppResult<Page<Task>>;

    async fn find_by_status(&self, status: TaskStatus, request: TaskPageRequest) -> AppResult<Page<Task>>;

    async fn find_all(&self, request: TaskPageRequest) -> AppResult<Page<Task>>;
}

fn page_tasks(mut tasks: Vec<Task>, status: Option<TaskStatus>, request: TaskPageRequest) -> Page<Task> {
    if let Some(status) = status {
        tasks.retain(|t| t.status == status);
    }
    request.sort.apply(&mut tasks);
    Page::from_sorted(tasks, request.page)
}

fn page_users(mut users: Vec<User>, request: PageRequest) -> Page<User> {
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    Page::from_sorted(users, request)
}
