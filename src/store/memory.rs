use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BootcampStore, CourseStore, Page, ReviewStore, StoreError, UserStore};
use crate::filter::schema::{BOOTCAMPS, COURSES, REVIEWS, USERS};
use crate::filter::{ListQuery, ResourceSchema};
use crate::models::{Bootcamp, Course, Review, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    bootcamps: HashMap<Uuid, Bootcamp>,
    courses: HashMap<Uuid, Course>,
    reviews: HashMap<Uuid, Review>,
}

/// Process-local store used by tests and `DATABASE_URL=memory`. Every write
/// takes the single write lock, so check-then-insert sequences are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_value<T: Serialize>(record: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Corrupt(e.to_string()))
}

/// Filter, sort and slice records the way the SQL backend would.
fn page_of<'a, T>(
    records: impl Iterator<Item = &'a T>,
    query: &ListQuery,
    schema: &ResourceSchema,
) -> Result<Page<T>, StoreError>
where
    T: Serialize + Clone + 'a,
{
    let mut matching = Vec::new();
    for record in records {
        let value = to_value(record)?;
        if query.matches(&value) {
            matching.push((value, record));
        }
    }
    matching.sort_by(|(a, _), (b, _)| query.compare(schema, a, b));

    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(query.offset() as usize)
        .take(query.limit as usize)
        .map(|(_, record)| record.clone())
        .collect();
    Ok(Page { items, total })
}

fn replace<T: Clone>(table: &mut HashMap<Uuid, T>, id: Uuid, record: &T) -> bool {
    match table.get_mut(&id) {
        Some(slot) => {
            *slot = record.clone();
            true
        }
        None => false,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0u32), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / f64::from(n))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_reset_token(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| {
                u.reset_password_token.as_deref() == Some(token_hash)
                    && u.reset_password_expire.is_some_and(|exp| exp > now)
            })
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email && u.id != user.id) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        Ok(replace(&mut tables.users, user.id, user))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.users.remove(&id).is_some())
    }

    async fn list_users(&self, query: &ListQuery) -> Result<Page<User>, StoreError> {
        let tables = self.tables.read().await;
        page_of(tables.users.values(), query, &USERS)
    }

    async fn purge_users(&self) -> Result<(), StoreError> {
        self.tables.write().await.users.clear();
        Ok(())
    }
}

#[async_trait]
impl BootcampStore for MemoryStore {
    async fn insert_bootcamp(&self, bootcamp: &Bootcamp, admit: &(dyn Fn(u64) -> bool + Send + Sync)) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let owned = tables.bootcamps.values().filter(|b| b.owner_id == bootcamp.owner_id).count() as u64;
        if !admit(owned) {
            return Ok(false);
        }
        if tables.bootcamps.values().any(|b| b.name == bootcamp.name) {
            return Err(StoreError::Duplicate("name".to_string()));
        }
        tables.bootcamps.insert(bootcamp.id, bootcamp.clone());
        Ok(true)
    }

    async fn find_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, StoreError> {
        Ok(self.tables.read().await.bootcamps.get(&id).cloned())
    }

    async fn find_bootcamps(&self, ids: &[Uuid]) -> Result<Vec<Bootcamp>, StoreError> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.bootcamps.get(id).cloned()).collect())
    }

    async fn update_bootcamp(&self, bootcamp: &Bootcamp) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.bootcamps.values().any(|b| b.name == bootcamp.name && b.id != bootcamp.id) {
            return Err(StoreError::Duplicate("name".to_string()));
        }
        Ok(replace(&mut tables.bootcamps, bootcamp.id, bootcamp))
    }

    async fn delete_bootcamp(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.bootcamps.remove(&id).is_some())
    }

    async fn list_bootcamps(&self, query: &ListQuery) -> Result<Page<Bootcamp>, StoreError> {
        let tables = self.tables.read().await;
        page_of(tables.bootcamps.values(), query, &BOOTCAMPS)
    }

    async fn bootcamps_within(&self, longitude: f64, latitude: f64, radius: f64) -> Result<Vec<Bootcamp>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .bootcamps
            .values()
            .filter(|b| b.location.as_ref().is_some_and(|loc| loc.angle_to(longitude, latitude) <= radius))
            .cloned()
            .collect())
    }

    async fn set_average_cost(&self, id: Uuid, cost: Option<i64>) -> Result<(), StoreError> {
        if let Some(b) = self.tables.write().await.bootcamps.get_mut(&id) {
            b.average_cost = cost;
        }
        Ok(())
    }

    async fn set_average_rating(&self, id: Uuid, rating: Option<f64>) -> Result<(), StoreError> {
        if let Some(b) = self.tables.write().await.bootcamps.get_mut(&id) {
            b.average_rating = rating;
        }
        Ok(())
    }

    async fn purge_bootcamps(&self) -> Result<(), StoreError> {
        self.tables.write().await.bootcamps.clear();
        Ok(())
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn insert_course(&self, course: &Course) -> Result<(), StoreError> {
        self.tables.write().await.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        Ok(self.tables.read().await.courses.get(&id).cloned())
    }

    async fn update_course(&self, course: &Course) -> Result<bool, StoreError> {
        Ok(replace(&mut self.tables.write().await.courses, course.id, course))
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.courses.remove(&id).is_some())
    }

    async fn list_courses(&self, query: &ListQuery) -> Result<Page<Course>, StoreError> {
        let tables = self.tables.read().await;
        page_of(tables.courses.values(), query, &COURSES)
    }

    async fn courses_for_bootcamps(&self, bootcamp_ids: &[Uuid]) -> Result<Vec<Course>, StoreError> {
        let tables = self.tables.read().await;
        let mut courses: Vec<Course> = tables
            .courses
            .values()
            .filter(|c| bootcamp_ids.contains(&c.bootcamp_id))
            .cloned()
            .collect();
        courses.sort_by_key(|c| (c.created_at, c.id));
        Ok(courses)
    }

    async fn delete_courses_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.courses.len();
        tables.courses.retain(|_, c| c.bootcamp_id != bootcamp_id);
        Ok((before - tables.courses.len()) as u64)
    }

    async fn average_tuition(&self, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError> {
        let tables = self.tables.read().await;
        Ok(mean(
            tables
                .courses
                .values()
                .filter(|c| c.bootcamp_id == bootcamp_id)
                .map(|c| c.tuition),
        ))
    }

    async fn purge_courses(&self) -> Result<(), StoreError> {
        self.tables.write().await.courses.clear();
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_review(&self, review: &Review) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .reviews
            .values()
            .any(|r| r.bootcamp_id == review.bootcamp_id && r.owner_id == review.owner_id)
        {
            return Err(StoreError::Duplicate("bootcamp, user".to_string()));
        }
        tables.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        Ok(self.tables.read().await.reviews.get(&id).cloned())
    }

    async fn update_review(&self, review: &Review) -> Result<bool, StoreError> {
        Ok(replace(&mut self.tables.write().await.reviews, review.id, review))
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.reviews.remove(&id).is_some())
    }

    async fn list_reviews(&self, query: &ListQuery) -> Result<Page<Review>, StoreError> {
        let tables = self.tables.read().await;
        page_of(tables.reviews.values(), query, &REVIEWS)
    }

    async fn reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Review>, StoreError> {
        let tables = self.tables.read().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .values()
            .filter(|r| r.bootcamp_id == bootcamp_id)
            .cloned()
            .collect();
        reviews.sort_by_key(|r| (r.created_at, r.id));
        Ok(reviews)
    }

    async fn delete_reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.reviews.len();
        tables.reviews.retain(|_, r| r.bootcamp_id != bootcamp_id);
        Ok((before - tables.reviews.len()) as u64)
    }

    async fn average_rating(&self, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError> {
        let tables = self.tables.read().await;
        Ok(mean(
            tables
                .reviews
                .values()
                .filter(|r| r.bootcamp_id == bootcamp_id)
                .map(|r| f64::from(r.rating)),
        ))
    }

    async fn purge_reviews(&self) -> Result<(), StoreError> {
        self.tables.write().await.reviews.clear();
        Ok(())
    }
}
