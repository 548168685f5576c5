use std::fmt;
use std::str::FromStr;

use err_derive::Error;
use serde::{Deserialize, Serialize};

use infra::documents::DocMeta;
use infra::entity;

use crate::crud::Form;
use crate::errors::ValidationError;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Default for Role {
    fn default() -> Self {
        Role::Employee
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error(display = "unknown role: {:?}", _0)]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "employee" => Ok(Role::Employee),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
        };
        fmt.write_str(name)
    }
}

/// A back-office login. The backend never returns passwords, so a listed
/// user has an empty one.
#[derive(Deserialize, Serialize, Clone, PartialEq)]
pub struct User {
    #[serde(flatten)]
    pub meta: DocMeta<User>,
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

entity!(User, "users");

impl fmt::Debug for User {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("User")
            .field("meta", &self.meta)
            .field("username", &self.username)
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Clone, Default, PartialEq)]
pub struct UserForm {
    pub username: String,
    pub password: String,
    pub role: Role,
}

// Keeps passwords out of logs.
impl fmt::Debug for UserForm {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("UserForm")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish()
    }
}

impl Form for UserForm {
    type Record = User;

    fn to_record(&self) -> Result<User, ValidationError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ValidationError::Incomplete("All fields are required."));
        }
        Ok(User {
            meta: DocMeta::default(),
            username: self.username.trim().to_string(),
            password: self.password.clone(),
            role: self.role,
        })
    }

    /// The password is never carried into an edit; it must be typed again.
    fn with_record(&self, record: &User) -> Self {
        UserForm {
            username: record.username.clone(),
            password: String::new(),
            role: record.role,
        }
    }

    fn reset(&self) -> Self {
        UserForm::default()
    }
}
