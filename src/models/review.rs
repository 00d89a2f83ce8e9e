use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{check_max_len, require_text, ValidationErrors};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 10;
pub const MAX_TITLE_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "bootcamp")]
    pub bootcamp_id: Uuid,
    #[serde(rename = "user")]
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<i32>,
}

fn check_rating(rating: i32, errors: &mut ValidationErrors) {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        errors.add("rating", "Please add a rating between 1 and 10");
    }
}

impl Review {
    pub fn from_input(input: ReviewInput, bootcamp_id: Uuid, owner_id: Uuid) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let title = require_text(input.title, "title", "Please add a title for the review", &mut errors);
        check_max_len(&title, MAX_TITLE_LEN, "title", "Review title cannot be more than 100 characters", &mut errors);
        let text = require_text(input.text, "text", "Please add some text", &mut errors);
        let rating = match input.rating {
            Some(r) => {
                check_rating(r, &mut errors);
                r
            }
            None => {
                errors.add("rating", "Please add a rating between 1 and 10");
                MIN_RATING
            }
        };
        errors.into_result()?;

        Ok(Self {
            id: Uuid::new_v4(),
            title,
            text,
            rating,
            created_at: Utc::now(),
            bootcamp_id,
            owner_id,
        })
    }

    pub fn apply_update(&mut self, input: ReviewInput) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = input.title {
            self.title = title.trim().to_string();
            if self.title.is_empty() {
                errors.add("title", "Please add a title for the review");
            }
            check_max_len(&self.title, MAX_TITLE_LEN, "title", "Review title cannot be more than 100 characters", &mut errors);
        }
        if let Some(text) = input.text {
            self.text = text.trim().to_string();
            if self.text.is_empty() {
                errors.add("text", "Please add some text");
            }
        }
        if let Some(rating) = input.rating {
            check_rating(rating, &mut errors);
            self.rating = rating;
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        let base = ReviewInput {
            title: Some("Great".into()),
            text: Some("Learned a lot".into()),
            rating: Some(11),
        };
        assert!(Review::from_input(base.clone(), Uuid::new_v4(), Uuid::new_v4()).is_err());
        let ok = ReviewInput { rating: Some(10), ..base.clone() };
        assert_eq!(Review::from_input(ok, Uuid::new_v4(), Uuid::new_v4()).unwrap().rating, 10);
        let low = ReviewInput { rating: Some(0), ..base };
        assert!(Review::from_input(low, Uuid::new_v4(), Uuid::new_v4()).is_err());
    }

    #[test]
    fn update_validates_rating() {
        let input = ReviewInput {
            title: Some("Great".into()),
            text: Some("Learned a lot".into()),
            rating: Some(8),
        };
        let mut review = Review::from_input(input, Uuid::new_v4(), Uuid::new_v4()).unwrap();
        let err = review
            .apply_update(ReviewInput { rating: Some(42), ..Default::default() })
            .unwrap_err();
        assert!(err.fields().contains_key("rating"));
    }
}
