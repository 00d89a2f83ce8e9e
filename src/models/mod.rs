pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;

pub use bootcamp::{Bootcamp, BootcampInput, BootcampSummary, Career, Location};
pub use course::{Course, CourseInput, MinimumSkill};
pub use review::{Review, ReviewInput};
pub use user::{validate_password, Role, User, UserInput};

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Field-level validation failures collected while building or updating a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        // First failure per field wins
        self.fields.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self.fields.values().cloned().collect::<Vec<_>>().join(", ");
        write!(f, "{}", joined)
    }
}

impl std::error::Error for ValidationErrors {}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
}

pub fn is_valid_http_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Trim a required text field, recording an error when it is missing or blank.
pub(crate) fn require_text(
    value: Option<String>,
    field: &str,
    message: &str,
    errors: &mut ValidationErrors,
) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            errors.add(field, message);
            String::new()
        }
    }
}

pub(crate) fn check_max_len(value: &str, max: usize, field: &str, message: &str, errors: &mut ValidationErrors) {
    if value.chars().count() > max {
        errors.add(field, message);
    }
}

/// Accepts `"8"` or `8` for fields stored as text.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

/// Lowercase, collapse every run of non-alphanumerics into a single dash.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
