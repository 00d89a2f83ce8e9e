use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::{is_valid_email, require_text, ValidationErrors};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub reset_password_token: Option<String>,
    #[serde(skip)]
    pub reset_password_expire: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Body accepted by registration and the admin user endpoints. Every field is
/// optional so the same shape serves partial updates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

pub fn validate_password(password: Option<&str>, errors: &mut ValidationErrors) {
    match password {
        None | Some("") => errors.add("password", "Please add a password"),
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => errors.add(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ),
        Some(_) => {}
    }
}

fn validate_email(email: &str, errors: &mut ValidationErrors) {
    if !email.is_empty() && !is_valid_email(email) {
        errors.add("email", "Please use a valid email");
    }
}

impl UserInput {
    /// Validate a new user. The password is checked but returned untouched;
    /// hashing is the caller's concern.
    pub fn into_new(self) -> Result<(String, String, String, Role), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = require_text(self.name, "name", "Please provide a name", &mut errors);
        let email = require_text(self.email, "email", "Please provide an email address", &mut errors)
            .to_lowercase();
        validate_email(&email, &mut errors);
        validate_password(self.password.as_deref(), &mut errors);
        errors.into_result()?;
        Ok((name, email, self.password.unwrap_or_default(), self.role.unwrap_or_default()))
    }
}

impl User {
    pub fn new(name: String, email: String, role: Role, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            role,
            password_hash,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        }
    }

    /// Apply name/email/role from `input`. Passwords change only through the
    /// dedicated password flows.
    pub fn apply_update(&mut self, input: UserInput) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                errors.add("name", "Please provide a name");
            }
            self.name = name;
        }
        if let Some(email) = input.email {
            let email = email.trim().to_lowercase();
            if email.is_empty() {
                errors.add("email", "Please provide an email address");
            }
            validate_email(&email, &mut errors);
            self.email = email;
        }
        if let Some(role) = input.role {
            self.role = role;
        }
        errors.into_result()
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_password_token = None;
        self.reset_password_expire = None;
    }
}
