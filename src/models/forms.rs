use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::page::PageRequest;
use super::task::TaskStatus;
use super::user::Role;
use crate::errors::{AppError, AppResult};
use crate::validation::Validator;

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

// A validator that reported no errors always yields every field.
fn incomplete() -> AppError {
    AppError::Internal("validated form is missing a field".into())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Role,
}

impl RegisterForm {
    pub fn validate(self) -> AppResult<NewAccount> {
        let mut v = Validator::new();
        let username = v.required("username", self.username.as_deref(), "username is not empty");
        let password = v.password("password", self.password.as_deref());
        let full_name = v.required("fullName", self.full_name.as_deref(), "full name is not empty");
        let role = v
            .required("role", self.role.as_deref(), "role is not empty")
            .and_then(|r| v.parse::<Role>("role", &r, "Invalid role"));
        v.finish()?;

        match (username, password, role) {
            (Some(username), Some(password), Some(role)) => Ok(NewAccount {
                username,
                password,
                full_name,
                role,
            }),
            _ => Err(incomplete()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(self) -> AppResult<Credentials> {
        let mut v = Validator::new();
        let username = v.required("username", self.username.as_deref(), "username is not empty");
        let password = match self.password {
            Some(p) if !p.is_empty() => Some(p),
            _ => {
                v.reject("password", Value::Null, "password is not empty");
                None
            }
        };
        v.finish()?;

        match (username, password) {
            (Some(username), Some(password)) => Ok(Credentials { username, password }),
            _ => Err(incomplete()),
        }
    }
}

/// Body of the admin and self-service user endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserChanges {
    pub password: String,
    pub full_name: Option<String>,
    pub role: Option<Role>,
}

impl UserForm {
    pub fn validate_new(self) -> AppResult<NewAccount> {
        RegisterForm {
            username: self.username,
            password: self.password,
            full_name: self.full_name,
            role: self.role,
        }
        .validate()
    }

    pub fn validate_changes(self) -> AppResult<UserChanges> {
        let mut v = Validator::new();
        let password = v.password("password", self.password.as_deref());
        let full_name = self
            .full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        let role = self
            .role
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .and_then(|r| v.parse::<Role>("role", r, "Invalid role"));
        v.finish()?;

        match password {
            Some(password) => Ok(UserChanges { password, full_name, role }),
            None => Err(incomplete()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(alias = "userId")]
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub deadline: DateTime<Utc>,
    pub owner_id: Option<String>,
}

impl TaskForm {
    pub fn validate(self) -> AppResult<TaskDraft> {
        let mut v = Validator::new();
        let title = v.required("title", self.title.as_deref(), "Title must not be blank");
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => Some(TaskStatus::default()),
            Some(s) => v.parse::<TaskStatus>("status", s, "Invalid status value"),
        };
        if self.deadline.is_none() {
            v.reject("deadline", Value::Null, "Deadline must not be null");
        }
        v.finish()?;

        let owner_id = self
            .owner_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        match (title, status, self.deadline) {
            (Some(title), Some(status), Some(deadline)) => Ok(TaskDraft {
                title,
                description: self.description,
                status,
                deadline,
                owner_id,
            }),
            _ => Err(incomplete()),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub size: Option<usize>,
}

impl PageQuery {
    pub fn validate(&self) -> AppResult<PageRequest> {
        let mut v = Validator::new();
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            v.reject("size", Value::from(size), "size must be between 1 and 100");
        }
        v.finish()?;
        Ok(PageRequest::new(self.page.unwrap_or(0), size))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub page: Option<usize>,
    pub size: Option<usize>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub direction: Option<String>,
}

impl ListTasksQuery {
    pub fn page_request(&self) -> AppResult<PageRequest> {
        PageQuery { page: self.page, size: self.size }.validate()
    }

    pub fn status(&self) -> AppResult<Option<TaskStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => {
                let mut v = Validator::new();
                let status = v.parse::<TaskStatus>("status", s, "Invalid status");
                v.finish()?;
                Ok(status)
            }
        }
    }
}
