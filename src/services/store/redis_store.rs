use std::sync::Arc;

use async_trait::async_trait;
use redis::{aio::Connection, AsyncCommands, Client};
use serde::de::DeserializeOwned;

use super::{page_tasks, page_users, TaskStore, UserStore};
use crate::errors::{AppError, AppResult};
use crate::models::{Page, PageRequest, Task, TaskPageRequest, TaskStatus, User};

const USERS_KEY: &str = "users";
const TASKS_KEY: &str = "tasks";

fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

fn username_key(username: &str) -> String {
    format!("username:{}", username)
}

fn task_key(id: &str) -> String {
    format!("task:{}", id)
}

fn owner_tasks_key(owner_id: &str) -> String {
    format!("user_tasks:{}", owner_id)
}

/// Owner set to leave when `task` overwrites `previous`.
fn vacated_owner_set(previous: Option<&Task>, task: &Task) -> Option<String> {
    previous
        .filter(|p| p.owner_id != task.owner_id)
        .map(|p| owner_tasks_key(&p.owner_id))
}

/// Splits tasks loaded through an owner set into the ones that owner still holds
/// and the ids of stale members.
fn split_owned(tasks: Vec<Task>, owner_id: &str) -> (Vec<Task>, Vec<String>) {
    let (owned, stale): (Vec<Task>, Vec<Task>) = tasks.into_iter().partition(|t| t.owner_id == owner_id);
    (owned, stale.into_iter().map(|t| t.id).collect())
}

/// Users and tasks as JSON documents, with id sets for scans and a
/// `username:` index claimed with SET NX.
pub struct RedisStore {
    client: Arc<Client>,
}

impl RedisStore {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    async fn connection(&self) -> AppResult<Connection> {
        Ok(self.client.get_async_connection().await?)
    }

    async fn get_json<T: DeserializeOwned>(conn: &mut Connection, key: &str) -> AppResult<Option<T>> {
        let data: Option<String> = conn.get(key).await?;
        data.map(|d| serde_json::from_str(&d))
            .transpose()
            .map_err(AppError::from)
    }

    // Ids whose document vanished between SMEMBERS and MGET are skipped.
    async fn get_many<T: DeserializeOwned>(conn: &mut Connection, keys: Vec<String>) -> AppResult<Vec<T>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = redis::cmd("MGET").arg(&keys).query_async(conn).await?;
        values
            .into_iter()
            .flatten()
            .map(|d| serde_json::from_str(&d).map_err(AppError::from))
            .collect()
    }

    async fn tasks_in(&self, set_key: &str) -> AppResult<Vec<Task>> {
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn.smembers(set_key).await?;
        Self::get_many(&mut conn, ids.iter().map(|id| task_key(id)).collect()).await
    }

    // The owner set can trail the documents after racing reassignments, so the
    // documents decide ownership and stale members are pruned.
    async fn owned_tasks(&self, owner_id: &str) -> AppResult<Vec<Task>> {
        let set_key = owner_tasks_key(owner_id);
        let (owned, stale) = split_owned(self.tasks_in(&set_key).await?, owner_id);

        if !stale.is_empty() {
            tracing::warn!("Pruning {} stale task ids from {}", stale.len(), set_key);
            let mut conn = self.connection().await?;
            conn.srem::<_, _, ()>(&set_key, &stale).await?;
        }
        Ok(owned)
    }
}

impl Clone for RedisStore {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone()
        }
    }
}

#[async_trait]
impl UserStore for RedisStore {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let mut conn = self.connection().await?;
        let id: Option<String> = conn.get(username_key(username)).await?;
        match id {
            Some(id) => Self::get_json(&mut conn, &user_key(&id)).await,
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let mut conn = self.connection().await?;
        Self::get_json(&mut conn, &user_key(id)).await
    }

    async fn save(&self, user: User) -> AppResult<User> {
        let mut conn = self.connection().await?;
        let index = username_key(&user.username);

        let claimed: bool = conn.set_nx(&index, &user.id).await?;
        if !claimed {
            let holder: Option<String> = conn.get(&index).await?;
            if holder.as_deref() != Some(user.id.as_str()) {
                return Err(AppError::UsernameTaken(user.username));
            }
        }

        let document = serde_json::to_string(&user)?;
        let stored = redis::pipe()
            .atomic()
            .set(user_key(&user.id), document)
            .ignore()
            .sadd(USERS_KEY, &user.id)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await;

        if let Err(e) = stored {
            // Release the name so a failed write does not reserve it forever.
            if claimed {
                if let Err(release) = conn.del::<_, ()>(&index).await {
                    tracing::warn!("Failed to release {} after write error: {}", index, release);
                }
            }
            return Err(e.into());
        }
        Ok(user)
    }

    async fn delete(&self, user: &User) -> AppResult<()> {
        let mut conn = self.connection().await?;
        redis::pipe()
            .atomic()
            .del(user_key(&user.id))
            .ignore()
            .del(username_key(&user.username))
            .ignore()
            .srem(USERS_KEY, &user.id)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn find_all_order_by_created_desc(&self, page: PageRequest) -> AppResult<Page<User>> {
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn.smembers(USERS_KEY).await?;
        let users = Self::get_many(&mut conn, ids.iter().map(|id| user_key(id)).collect()).await?;
        Ok(page_users(users, page))
    }
}

#[async_trait]
impl TaskStore for RedisStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Task>> {
        let mut conn = self.connection().await?;
        Self::get_json(&mut conn, &task_key(id)).await
    }

    async fn save(&self, task: Task) -> AppResult<Task> {
        let mut conn = self.connection().await?;
        let previous: Option<Task> = Self::get_json(&mut conn, &task_key(&task.id)).await?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(task_key(&task.id), serde_json::to_string(&task)?)
            .ignore()
            .sadd(TASKS_KEY, &task.id)
            .ignore()
            .sadd(owner_tasks_key(&task.owner_id), &task.id)
            .ignore();
        if let Some(vacated) = vacated_owner_set(previous.as_ref(), &task) {
            pipe.srem(vacated, &task.id).ignore();
        }
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(task)
    }

    async fn delete(&self, task: &Task) -> AppResult<()> {
        let mut conn = self.connection().await?;
        redis::pipe()
            .atomic()
            .del(task_key(&task.id))
            .ignore()
            .srem(TASKS_KEY, &task.id)
            .ignore()
            .srem(owner_tasks_key(&task.owner_id), &task.id)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete_by_owner(&self, owner_id: &str) -> AppResult<usize> {
        let mut conn = self.connection().await?;
        let set_key = owner_tasks_key(owner_id);
        let ids: Vec<String> = conn.smembers(&set_key).await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        for id in &ids {
            pipe.del(task_key(id)).ignore().srem(TASKS_KEY, id).ignore();
        }
        pipe.del(&set_key).ignore();
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(ids.len())
    }

    async fn find_by_owner(&self, owner_id: &str, request: TaskPageRequest) -> AppResult<Page<Task>> {
        let tasks = self.owned_tasks(owner_id).await?;
        Ok(page_tasks(tasks, None, request))
    }

    async fn find_by_owner_and_status(
        &self,
        owner_id: &str,
        status: TaskStatus,
        request: TaskPageRequest,
    ) -> AppResult<Page<Task>> {
        let tasks = self.owned_tasks(owner_id).await?;
        Ok(page_tasks(tasks, Some(status), request))
    }

    async fn find_by_status(&self, status: TaskStatus, request: TaskPageRequest) -> AppResult<Page<Task>> {
        let tasks = self.tasks_in(TASKS_KEY).await?;
        Ok(page_tasks(tasks, Some(status), request))
    }

    async fn find_all(&self, request: TaskPageRequest) -> AppResult<Page<Task>> {
        let tasks = self.tasks_in(TASKS_KEY).await?;
        Ok(page_tasks(tasks, None, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, TaskSort};
    use chrono::Utc;

    fn task(id: &str, owner: &str) -> Task {
        Task {
            id: id.into(),
            title: id.into(),
            description: None,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
            deadline: Utc::now(),
            owner_id: owner.into(),
        }
    }

    fn first_page() -> TaskPageRequest {
        TaskPageRequest { page: PageRequest::new(0, 10), sort: TaskSort::default() }
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(user_key("u1"), "user:u1");
        assert_eq!(username_key("alice"), "username:alice");
        assert_eq!(task_key("t1"), "task:t1");
        assert_eq!(owner_tasks_key("u1"), "user_tasks:u1");
    }

    #[test]
    fn test_vacated_owner_set_only_on_reassignment() {
        let current = task("t1", "u2");

        assert_eq!(vacated_owner_set(None, &current), None);
        assert_eq!(vacated_owner_set(Some(&task("t1", "u2")), &current), None);
        assert_eq!(
            vacated_owner_set(Some(&task("t1", "u1")), &current),
            Some("user_tasks:u1".to_string())
        );
    }

    #[test]
    fn test_split_owned_drops_tasks_owned_elsewhere() {
        let loaded = vec![task("t1", "u1"), task("t2", "u3"), task("t3", "u1")];

        let (owned, stale) = split_owned(loaded, "u1");
        assert_eq!(owned.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["t1", "t3"]);
        assert_eq!(stale, vec!["t2".to_string()]);
    }

    fn local_store() -> RedisStore {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".into());
        RedisStore::new(Arc::new(Client::open(url).unwrap()))
    }

    #[tokio::test]
    #[ignore = "needs a local Redis server"]
    async fn test_reassignment_moves_owner_set_membership() {
        let store = local_store();
        let (from, to) = (uuid::Uuid::new_v4().to_string(), uuid::Uuid::new_v4().to_string());
        let id = uuid::Uuid::new_v4().to_string();

        TaskStore::save(&store, task(&id, &from)).await.unwrap();
        TaskStore::save(&store, task(&id, &to)).await.unwrap();

        assert_eq!(store.find_by_owner(&from, first_page()).await.unwrap().total_items, 0);
        assert_eq!(store.find_by_owner(&to, first_page()).await.unwrap().items[0].owner_id, to);

        TaskStore::delete(&store, &task(&id, &to)).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "needs a local Redis server"]
    async fn test_owner_listing_prunes_stale_membership() {
        let store = local_store();
        let (owner, other) = (uuid::Uuid::new_v4().to_string(), uuid::Uuid::new_v4().to_string());
        let id = uuid::Uuid::new_v4().to_string();
        TaskStore::save(&store, task(&id, &owner)).await.unwrap();

        // membership left behind by a lost reassignment race
        let mut conn = store.connection().await.unwrap();
        conn.sadd::<_, _, ()>(owner_tasks_key(&other), &id).await.unwrap();

        let page = store.find_by_owner(&other, first_page()).await.unwrap();
        assert!(page.items.is_empty());
        let members: Vec<String> = conn.smembers(owner_tasks_key(&other)).await.unwrap();
        assert!(members.is_empty());

        TaskStore::delete(&store, &task(&id, &owner)).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "needs a local Redis server"]
    async fn test_duplicate_username_is_rejected() {
        let store = local_store();
        let name = format!("user-{}", uuid::Uuid::new_v4());
        let first = User::new(name.clone(), "hash".into(), None, Role::User);
        let second = User::new(name.clone(), "hash".into(), None, Role::User);

        UserStore::save(&store, first.clone()).await.unwrap();
        assert!(matches!(
            UserStore::save(&store, second).await,
            Err(AppError::UsernameTaken(_))
        ));

        UserStore::delete(&store, &first).await.unwrap();
    }
}
