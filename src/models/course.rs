use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::{require_text, string_or_number, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinimumSkill {
    Beginner,
    Intermediate,
    Advanced,
}

impl MinimumSkill {
    pub fn as_str(&self) -> &'static str {
        match self {
            MinimumSkill::Beginner => "beginner",
            MinimumSkill::Intermediate => "intermediate",
            MinimumSkill::Advanced => "advanced",
        }
    }
}

impl FromStr for MinimumSkill {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(MinimumSkill::Beginner),
            "intermediate" => Ok(MinimumSkill::Intermediate),
            "advanced" => Ok(MinimumSkill::Advanced),
            other => Err(format!("`{}` is not a valid minimum skill", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: f64,
    pub minimum_skill: MinimumSkill,
    pub scholarship_available: bool,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "bootcamp")]
    pub bootcamp_id: Uuid,
    #[serde(rename = "user")]
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub weeks: Option<String>,
    pub tuition: Option<f64>,
    pub minimum_skill: Option<String>,
    pub scholarship_available: Option<bool>,
}

fn parse_skill(raw: &str, errors: &mut ValidationErrors) -> MinimumSkill {
    raw.parse().unwrap_or_else(|msg: String| {
        errors.add("minimumSkill", msg);
        MinimumSkill::Beginner
    })
}

fn check_tuition(tuition: f64, errors: &mut ValidationErrors) {
    if !tuition.is_finite() || tuition < 0.0 {
        errors.add("tuition", "Tuition must be a non-negative number");
    }
}

impl Course {
    pub fn from_input(input: CourseInput, bootcamp_id: Uuid, owner_id: Uuid) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let title = require_text(input.title, "title", "Please add a course title", &mut errors);
        let description = require_text(input.description, "description", "Please add the course description", &mut errors);
        let weeks = require_text(input.weeks, "weeks", "Please add the number of weeks", &mut errors);
        let tuition = match input.tuition {
            Some(t) => {
                check_tuition(t, &mut errors);
                t
            }
            None => {
                errors.add("tuition", "Please add the tuition cost");
                0.0
            }
        };
        let minimum_skill = match input.minimum_skill.as_deref() {
            Some(raw) => parse_skill(raw, &mut errors),
            None => {
                errors.add("minimumSkill", "Please add a minimum skill");
                MinimumSkill::Beginner
            }
        };
        errors.into_result()?;

        Ok(Self {
            id: Uuid::new_v4(),
            title,
            description,
            weeks,
            tuition,
            minimum_skill,
            scholarship_available: input.scholarship_available.unwrap_or(false),
            created_at: Utc::now(),
            bootcamp_id,
            owner_id,
        })
    }

    pub fn apply_update(&mut self, input: CourseInput) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = input.title {
            self.title = title.trim().to_string();
            if self.title.is_empty() {
                errors.add("title", "Please add a course title");
            }
        }
        if let Some(description) = input.description {
            self.description = description.trim().to_string();
            if self.description.is_empty() {
                errors.add("description", "Please add the course description");
            }
        }
        if let Some(weeks) = input.weeks {
            self.weeks = weeks.trim().to_string();
            if self.weeks.is_empty() {
                errors.add("weeks", "Please add the number of weeks");
            }
        }
        if let Some(tuition) = input.tuition {
            check_tuition(tuition, &mut errors);
            self.tuition = tuition;
        }
        if let Some(raw) = input.minimum_skill.as_deref() {
            self.minimum_skill = parse_skill(raw, &mut errors);
        }
        if let Some(v) = input.scholarship_available {
            self.scholarship_available = v;
        }
        errors.into_result()
    }
}
