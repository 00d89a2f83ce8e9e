//! Persistence seams. Each resource has its own trait so services depend only
//! on what they touch; the memory and PostgreSQL backends implement all four.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::filter::{FilterError, ListQuery};
use crate::models::{Bootcamp, Course, Review, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write; carries the constraint or field.
    #[error("Duplicate value for {0}")]
    Duplicate(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// One page of a filtered listing plus the total number of matches.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// User whose reset token hash matches and whose expiry is after `now`.
    async fn find_user_by_reset_token(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<User>, StoreError>;
    /// Replace every stored column, password hash and reset token included.
    async fn update_user(&self, user: &User) -> Result<bool, StoreError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn list_users(&self, query: &ListQuery) -> Result<Page<User>, StoreError>;
    async fn purge_users(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait BootcampStore: Send + Sync {
    /// Count the owner's bootcamps and insert atomically; returns `false`
    /// without writing when `admit` rejects the count.
    async fn insert_bootcamp(&self, bootcamp: &Bootcamp, admit: &(dyn Fn(u64) -> bool + Send + Sync)) -> Result<bool, StoreError>;
    async fn find_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, StoreError>;
    async fn find_bootcamps(&self, ids: &[Uuid]) -> Result<Vec<Bootcamp>, StoreError>;
    async fn update_bootcamp(&self, bootcamp: &Bootcamp) -> Result<bool, StoreError>;
    async fn delete_bootcamp(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn list_bootcamps(&self, query: &ListQuery) -> Result<Page<Bootcamp>, StoreError>;
    /// Bootcamps located within `radius` radians of great-circle distance.
    async fn bootcamps_within(&self, longitude: f64, latitude: f64, radius: f64) -> Result<Vec<Bootcamp>, StoreError>;
    async fn set_average_cost(&self, id: Uuid, cost: Option<i64>) -> Result<(), StoreError>;
    async fn set_average_rating(&self, id: Uuid, rating: Option<f64>) -> Result<(), StoreError>;
    async fn purge_bootcamps(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn insert_course(&self, course: &Course) -> Result<(), StoreError>;
    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, StoreError>;
    async fn update_course(&self, course: &Course) -> Result<bool, StoreError>;
    async fn delete_course(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn list_courses(&self, query: &ListQuery) -> Result<Page<Course>, StoreError>;
    async fn courses_for_bootcamps(&self, bootcamp_ids: &[Uuid]) -> Result<Vec<Course>, StoreError>;
    async fn delete_courses_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<u64, StoreError>;
    async fn average_tuition(&self, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError>;
    async fn purge_courses(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the user already reviewed the bootcamp.
    async fn insert_review(&self, review: &Review) -> Result<(), StoreError>;
    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, StoreError>;
    async fn update_review(&self, review: &Review) -> Result<bool, StoreError>;
    async fn delete_review(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn list_reviews(&self, query: &ListQuery) -> Result<Page<Review>, StoreError>;
    async fn reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Review>, StoreError>;
    async fn delete_reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<u64, StoreError>;
    async fn average_rating(&self, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError>;
    async fn purge_reviews(&self) -> Result<(), StoreError>;
}

/// Backend-agnostic handles shared by every service.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub bootcamps: Arc<dyn BootcampStore>,
    pub courses: Arc<dyn CourseStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pool: Option<sqlx::PgPool>,
}

impl Stores {
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            bootcamps: store.clone(),
            courses: store.clone(),
            reviews: store,
            pool: None,
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        Self {
            users: store.clone(),
            bootcamps: store.clone(),
            courses: store.clone(),
            reviews: store,
            pool: Some(pool),
        }
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            tracing::info!("Closed database pool");
        }
    }
}
