pub mod account;
pub mod authorization;
pub mod password;
pub mod store;
pub mod tasks;
pub mod token;
pub mod users;

pub use account::{AccountService, LoginResponse};
pub use password::PasswordHasher;
pub use store::{MemoryStore, RedisStore, TaskStore, UserStore};
pub use tasks::TaskService;
pub use token::TokenService;
pub use users::UserService;
