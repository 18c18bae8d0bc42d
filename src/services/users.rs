use std::sync::Arc;

use super::authorization::{can_manage_users, can_mutate_user, can_view_user, effective_role_visibility};
use super::password::PasswordHasher;
use super::store::{TaskStore, UserStore};
use crate::errors::{AppError, AppResult};
use crate::models::{NewAccount, Page, PageRequest, Principal, User, UserChanges, UserView};

/// Admin user management plus self view/update.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    tasks: Arc<dyn TaskStore>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, tasks: Arc<dyn TaskStore>, hasher: PasswordHasher) -> Self {
        Self { users, tasks, hasher }
    }

    fn require_admin(principal: &Principal, action: &str) -> AppResult<()> {
        if can_manage_users(principal) {
            Ok(())
        } else {
            tracing::warn!("User {} attempted to {} without admin role", principal.id, action);
            Err(AppError::forbidden(format!("{} requires admin role", action)))
        }
    }

    async fn load(&self, id: &str) -> AppResult<User> {
        self.users.find_by_id(id).await?.ok_or(AppError::UserNotFound)
    }

    pub async fn list(&self, principal: &Principal, page: PageRequest) -> AppResult<Page<UserView>> {
        Self::require_admin(principal, "list users")?;
        let users = self.users.find_all_order_by_created_desc(page).await?;
        tracing::info!(
            "Fetched users: page={}, totalItems={}, totalPages={}",
            users.page,
            users.total_items,
            users.total_pages
        );
        Ok(users.map(|u| u.view()))
    }

    pub async fn find_by_id(&self, principal: &Principal, id: &str) -> AppResult<UserView> {
        if !can_view_user(principal, id) {
            tracing::warn!("Unauthorized access attempt by user {} to user {}", principal.id, id);
            return Err(AppError::forbidden(format!("user {} may not view user {}", principal.id, id)));
        }

        let user = self.load(id).await?;
        Ok(effective_role_visibility(principal, user.view()))
    }

    pub async fn create(&self, principal: &Principal, account: NewAccount) -> AppResult<UserView> {
        Self::require_admin(principal, "create users")?;

        if self.users.find_by_username(&account.username).await?.is_some() {
            tracing::warn!("Attempt to create user with existing username: {}", account.username);
            return Err(AppError::UsernameTaken(account.username));
        }

        let password_hash = self.hasher.hash_blocking(account.password).await?;
        let user = User::new(account.username, password_hash, account.full_name, account.role);
        let user = self.users.save(user).await?;
        tracing::info!("Created new user: {}, role: {}", user.username, user.role);

        Ok(user.view())
    }

    /// Only admins may change the role; the username never changes.
    pub async fn update(&self, principal: &Principal, id: &str, changes: UserChanges) -> AppResult<UserView> {
        if !can_mutate_user(principal, id) {
            tracing::warn!("Unauthorized update attempt by user {} on user {}", principal.id, id);
            return Err(AppError::forbidden(format!("user {} may not update user {}", principal.id, id)));
        }

        let mut user = self.load(id).await?;
        user.password_hash = self.hasher.hash_blocking(changes.password).await?;
        if changes.full_name.is_some() {
            user.full_name = changes.full_name;
        }
        match changes.role {
            Some(role) if principal.is_admin() => user.role = role,
            Some(_) => tracing::warn!("Ignoring role change requested by non-admin {}", principal.id),
            None => {}
        }

        let user = self.users.save(user).await?;
        tracing::info!("User {} updated by user {}", id, principal.id);

        Ok(effective_role_visibility(principal, user.view()))
    }

    /// Removes the user together with every task they own.
    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<()> {
        Self::require_admin(principal, "delete users")?;

        let user = self.load(id).await?;
        let removed = self.tasks.delete_by_owner(&user.id).await?;
        self.users.delete(&user).await?;
        tracing::info!("Deleted user {} ({}) and {} owned tasks", id, user.username, removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, Task, TaskStatus};
    use crate::services::store::MemoryStore;
    use chrono::Utc;

    struct Fixture {
        service: UserService,
        store: Arc<MemoryStore>,
        admin: Principal,
        alice: Principal,
        bob: Principal,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let hasher = PasswordHasher::new(4);
        let service = UserService::new(store.clone(), store.clone(), hasher);

        let mut principals = Vec::new();
        for (name, role) in [("root", Role::Admin), ("alice", Role::User), ("bob", Role::User)] {
            let user = User::new(name.into(), hasher.hash("secret123").unwrap(), None, role);
            principals.push(Principal::new(user.id.clone(), role));
            UserStore::save(store.as_ref(), user).await.unwrap();
        }
        let bob = principals.pop().unwrap();
        let alice = principals.pop().unwrap();
        let admin = principals.pop().unwrap();

        Fixture { service, store, admin, alice, bob }
    }

    fn changes(role: Option<Role>) -> UserChanges {
        UserChanges { password: "newpass99".into(), full_name: Some("Renamed".into()), role }
    }

    #[tokio::test]
    async fn test_self_view_is_allowed_but_role_redacted() {
        let f = fixture().await;

        let view = f.service.find_by_id(&f.alice, &f.alice.id).await.unwrap();
        assert_eq!(view.username, "alice");
        assert_eq!(view.role, None);

        let view = f.service.find_by_id(&f.admin, &f.alice.id).await.unwrap();
        assert_eq!(view.role, Some(Role::User));
    }

    #[tokio::test]
    async fn test_viewing_another_user_is_forbidden() {
        let f = fixture().await;
        let result = f.service.find_by_id(&f.bob, &f.alice.id).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found_for_admin() {
        let f = fixture().await;
        let result = f.service.find_by_id(&f.admin, "missing").await;
        assert!(matches!(result, Err(AppError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_user_cannot_escalate_own_role() {
        let f = fixture().await;

        let view = f.service.update(&f.alice, &f.alice.id, changes(Some(Role::Admin))).await.unwrap();
        assert_eq!(view.full_name.as_deref(), Some("Renamed"));

        let stored = UserStore::find_by_id(f.store.as_ref(), &f.alice.id).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::User);
        assert!(PasswordHasher::new(4).verify("newpass99", &stored.password_hash));
    }

    #[tokio::test]
    async fn test_admin_can_change_role() {
        let f = fixture().await;

        let view = f.service.update(&f.admin, &f.bob.id, changes(Some(Role::Admin))).await.unwrap();
        assert_eq!(view.role, Some(Role::Admin));
    }

    #[tokio::test]
    async fn test_updating_another_user_is_forbidden() {
        let f = fixture().await;
        let result = f.service.update(&f.bob, &f.alice.id, changes(None)).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_management_requires_admin() {
        let f = fixture().await;
        let account = NewAccount {
            username: "carol".into(),
            password: "secret123".into(),
            full_name: None,
            role: Role::User,
        };

        assert!(matches!(
            f.service.list(&f.alice, PageRequest::new(0, 10)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.create(&f.alice, account.clone()).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(f.service.delete(&f.alice, &f.bob.id).await, Err(AppError::Forbidden(_))));

        let created = f.service.create(&f.admin, account.clone()).await.unwrap();
        assert_eq!(created.role, Some(Role::User));
        assert!(matches!(
            f.service.create(&f.admin, account).await,
            Err(AppError::UsernameTaken(_))
        ));

        let page = f.service.list(&f.admin, PageRequest::new(0, 10)).await.unwrap();
        assert_eq!(page.total_items, 4);
        assert_eq!(page.items[0].username, "carol");
    }

    #[tokio::test]
    async fn test_delete_cascades_to_owned_tasks() {
        let f = fixture().await;
        for (id, owner) in [("t1", &f.alice.id), ("t2", &f.alice.id), ("t3", &f.bob.id)] {
            let task = Task {
                id: id.into(),
                title: id.into(),
                description: None,
                status: TaskStatus::Pending,
                created_at: Utc::now(),
                updated_at: None,
                deadline: Utc::now(),
                owner_id: owner.clone(),
            };
            TaskStore::save(f.store.as_ref(), task).await.unwrap();
        }

        f.service.delete(&f.admin, &f.alice.id).await.unwrap();

        assert!(UserStore::find_by_id(f.store.as_ref(), &f.alice.id).await.unwrap().is_none());
        assert!(TaskStore::find_by_id(f.store.as_ref(), "t1").await.unwrap().is_none());
        assert!(TaskStore::find_by_id(f.store.as_ref(), "t3").await.unwrap().is_some());
        assert!(matches!(
            f.service.delete(&f.admin, &f.alice.id).await,
            Err(AppError::UserNotFound)
        ));
    }
}
