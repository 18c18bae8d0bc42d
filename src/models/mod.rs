mod user;
mod forms;
mod task;
mod page;
mod principal;
mod response;

pub use user::{Role, User, UserView};
pub use forms::{
    Credentials, ListTasksQuery, LoginForm, NewAccount, PageQuery, RegisterForm, TaskDraft, TaskForm,
    UserChanges, UserForm,
};
pub use task::{Task, TaskStatus, TaskView};
pub use page::{Page, PageRequest, SortDirection, SortField, TaskPageRequest, TaskSort};
pub use principal::Principal;
pub use response::ApiResponse;
