mod query_builder;
mod repository;
mod rows;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use self::repository::Repository;
use self::rows::{convert_all, BootcampRow, CourseRow, ReviewRow, UserRow};
use super::{BootcampStore, CourseStore, Page, ReviewStore, StoreError, UserStore};
use crate::config::DatabaseConfig;
use crate::filter::schema::{BOOTCAMPS, COURSES, REVIEWS, USERS};
use crate::filter::ListQuery;
use crate::models::{Bootcamp, Course, Review, User};

const INIT_SQL: &str = include_str!("../../../migrations/0001_init.sql");

pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout))
        .connect(&config.url)
        .await?;
    info!("Connected to PostgreSQL (max {} connections)", config.max_connections);
    Ok(pool)
}

/// Apply the embedded schema. Every statement is idempotent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    let statements = INIT_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}

/// Unique violations become [`StoreError::Duplicate`] naming the constraint.
fn map_unique(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            return StoreError::Duplicate(constraint);
        }
    }
    StoreError::Sqlx(err)
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_bootcamp_row(tx: &mut Transaction<'_, Postgres>, b: &Bootcamp) -> Result<(), StoreError> {
        let loc = b.location.as_ref();
        let careers: Vec<&str> = b.careers.iter().map(|c| c.as_str()).collect();
        sqlx::query(
            r#"INSERT INTO bootcamps (
                id, name, slug, description, website, phone, email, address,
                location_lng, location_lat, location_formatted_address, location_street,
                location_city, location_state, location_zipcode, location_country,
                careers, average_rating, average_cost, photo,
                housing, job_assistance, job_guarantee, accept_gi, created_at, user_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                      $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)"#,
        )
        .bind(b.id)
        .bind(&b.name)
        .bind(&b.slug)
        .bind(&b.description)
        .bind(&b.website)
        .bind(&b.phone)
        .bind(&b.email)
        .bind(&b.address)
        .bind(loc.map(|l| l.longitude()))
        .bind(loc.map(|l| l.latitude()))
        .bind(loc.and_then(|l| l.formatted_address.clone()))
        .bind(loc.and_then(|l| l.street.clone()))
        .bind(loc.and_then(|l| l.city.clone()))
        .bind(loc.and_then(|l| l.state.clone()))
        .bind(loc.and_then(|l| l.zipcode.clone()))
        .bind(loc.and_then(|l| l.country.clone()))
        .bind(careers)
        .bind(b.average_rating)
        .bind(b.average_cost)
        .bind(&b.photo)
        .bind(b.housing)
        .bind(b.job_assistance)
        .bind(b.job_guarantee)
        .bind(b.accept_gi)
        .bind(b.created_at)
        .bind(b.owner_id)
        .execute(&mut **tx)
        .await
        .map_err(map_unique)?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO users (id, name, email, role, password_hash, reset_password_token, reset_password_expire, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(&user.reset_password_token)
        .bind(user.reset_password_expire)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = Repository::<UserRow>::new(&USERS, &self.pool).select_id(id).await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_reset_token(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE reset_password_token = $1 AND reset_password_expire > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"UPDATE users SET name = $2, email = $3, role = $4, password_hash = $5,
                   reset_password_token = $6, reset_password_expire = $7
               WHERE id = $1"#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(&user.reset_password_token)
        .bind(user.reset_password_expire)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self, query: &ListQuery) -> Result<Page<User>, StoreError> {
        let page = Repository::<UserRow>::new(&USERS, &self.pool).page(query).await?;
        Ok(Page { items: convert_all(page.items)?, total: page.total })
    }

    async fn purge_users(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl BootcampStore for PgStore {
    async fn insert_bootcamp(&self, bootcamp: &Bootcamp, admit: &(dyn Fn(u64) -> bool + Send + Sync)) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        // Serializes concurrent creates by the same owner until commit
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(bootcamp.owner_id.to_string())
            .execute(&mut *tx)
            .await?;
        let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bootcamps WHERE user_id = $1")
            .bind(bootcamp.owner_id)
            .fetch_one(&mut *tx)
            .await?;
        if !admit(owned.max(0) as u64) {
            tx.rollback().await?;
            return Ok(false);
        }
        Self::insert_bootcamp_row(&mut tx, bootcamp).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn find_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, StoreError> {
        let row = Repository::<BootcampRow>::new(&BOOTCAMPS, &self.pool).select_id(id).await?;
        row.map(Bootcamp::try_from).transpose()
    }

    async fn find_bootcamps(&self, ids: &[Uuid]) -> Result<Vec<Bootcamp>, StoreError> {
        let rows = Repository::<BootcampRow>::new(&BOOTCAMPS, &self.pool).select_ids(ids).await?;
        convert_all(rows)
    }

    async fn update_bootcamp(&self, b: &Bootcamp) -> Result<bool, StoreError> {
        let loc = b.location.as_ref();
        let careers: Vec<&str> = b.careers.iter().map(|c| c.as_str()).collect();
        let result = sqlx::query(
            r#"UPDATE bootcamps SET
                name = $2, slug = $3, description = $4, website = $5, phone = $6, email = $7, address = $8,
                location_lng = $9, location_lat = $10, location_formatted_address = $11, location_street = $12,
                location_city = $13, location_state = $14, location_zipcode = $15, location_country = $16,
                careers = $17, housing = $18, job_assistance = $19, job_guarantee = $20, accept_gi = $21,
                photo = $22
               WHERE id = $1"#,
        )
        .bind(b.id)
        .bind(&b.name)
        .bind(&b.slug)
        .bind(&b.description)
        .bind(&b.website)
        .bind(&b.phone)
        .bind(&b.email)
        .bind(&b.address)
        .bind(loc.map(|l| l.longitude()))
        .bind(loc.map(|l| l.latitude()))
        .bind(loc.and_then(|l| l.formatted_address.clone()))
        .bind(loc.and_then(|l| l.street.clone()))
        .bind(loc.and_then(|l| l.city.clone()))
        .bind(loc.and_then(|l| l.state.clone()))
        .bind(loc.and_then(|l| l.zipcode.clone()))
        .bind(loc.and_then(|l| l.country.clone()))
        .bind(careers)
        .bind(b.housing)
        .bind(b.job_assistance)
        .bind(b.job_guarantee)
        .bind(b.accept_gi)
        .bind(&b.photo)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_bootcamp(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM bootcamps WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_bootcamps(&self, query: &ListQuery) -> Result<Page<Bootcamp>, StoreError> {
        let page = Repository::<BootcampRow>::new(&BOOTCAMPS, &self.pool).page(query).await?;
        Ok(Page { items: convert_all(page.items)?, total: page.total })
    }

    async fn bootcamps_within(&self, longitude: f64, latitude: f64, radius: f64) -> Result<Vec<Bootcamp>, StoreError> {
        // Haversine central angle, clamped for floating point drift
        let rows = sqlx::query_as::<_, BootcampRow>(
            r#"SELECT * FROM bootcamps
               WHERE location_lng IS NOT NULL AND location_lat IS NOT NULL
                 AND 2 * asin(least(1.0, sqrt(
                       power(sin(radians(location_lat - $2) / 2), 2)
                     + cos(radians($2)) * cos(radians(location_lat))
                       * power(sin(radians(location_lng - $1) / 2), 2)
                 ))) <= $3
               ORDER BY created_at DESC, id ASC"#,
        )
        .bind(longitude)
        .bind(latitude)
        .bind(radius)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn set_average_cost(&self, id: Uuid, cost: Option<i64>) -> Result<(), StoreError> {
        sqlx::query("UPDATE bootcamps SET average_cost = $2 WHERE id = $1")
            .bind(id)
            .bind(cost)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_average_rating(&self, id: Uuid, rating: Option<f64>) -> Result<(), StoreError> {
        sqlx::query("UPDATE bootcamps SET average_rating = $2 WHERE id = $1")
            .bind(id)
            .bind(rating)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_bootcamps(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM bootcamps").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CourseStore for PgStore {
    async fn insert_course(&self, c: &Course) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO courses (id, title, description, weeks, tuition, minimum_skill,
                   scholarship_available, created_at, bootcamp_id, user_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(c.id)
        .bind(&c.title)
        .bind(&c.description)
        .bind(&c.weeks)
        .bind(c.tuition)
        .bind(c.minimum_skill.as_str())
        .bind(c.scholarship_available)
        .bind(c.created_at)
        .bind(c.bootcamp_id)
        .bind(c.owner_id)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        let row = Repository::<CourseRow>::new(&COURSES, &self.pool).select_id(id).await?;
        row.map(Course::try_from).transpose()
    }

    async fn update_course(&self, c: &Course) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"UPDATE courses SET title = $2, description = $3, weeks = $4, tuition = $5,
                   minimum_skill = $6, scholarship_available = $7
               WHERE id = $1"#,
        )
        .bind(c.id)
        .bind(&c.title)
        .bind(&c.description)
        .bind(&c.weeks)
        .bind(c.tuition)
        .bind(c.minimum_skill.as_str())
        .bind(c.scholarship_available)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_courses(&self, query: &ListQuery) -> Result<Page<Course>, StoreError> {
        let page = Repository::<CourseRow>::new(&COURSES, &self.pool).page(query).await?;
        Ok(Page { items: convert_all(page.items)?, total: page.total })
    }

    async fn courses_for_bootcamps(&self, bootcamp_ids: &[Uuid]) -> Result<Vec<Course>, StoreError> {
        if bootcamp_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = Repository::<CourseRow>::new(&COURSES, &self.pool)
            .select_where("bootcamp_id", json!({ "$in": bootcamp_ids }))
            .await?;
        convert_all(rows)
    }

    async fn delete_courses_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM courses WHERE bootcamp_id = $1")
            .bind(bootcamp_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn average_tuition(&self, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError> {
        let avg: Option<f64> = sqlx::query_scalar("SELECT AVG(tuition) FROM courses WHERE bootcamp_id = $1")
            .bind(bootcamp_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(avg)
    }

    async fn purge_courses(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM courses").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn insert_review(&self, r: &Review) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO reviews (id, title, text, rating, created_at, bootcamp_id, user_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(r.id)
        .bind(&r.title)
        .bind(&r.text)
        .bind(r.rating)
        .bind(r.created_at)
        .bind(r.bootcamp_id)
        .bind(r.owner_id)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        let row = Repository::<ReviewRow>::new(&REVIEWS, &self.pool).select_id(id).await?;
        Ok(row.map(Review::from))
    }

    async fn update_review(&self, r: &Review) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE reviews SET title = $2, text = $3, rating = $4 WHERE id = $1")
            .bind(r.id)
            .bind(&r.title)
            .bind(&r.text)
            .bind(r.rating)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reviews(&self, query: &ListQuery) -> Result<Page<Review>, StoreError> {
        let page = Repository::<ReviewRow>::new(&REVIEWS, &self.pool).page(query).await?;
        Ok(page.map(Review::from))
    }

    async fn reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Review>, StoreError> {
        let rows = Repository::<ReviewRow>::new(&REVIEWS, &self.pool)
            .select_where("bootcamp_id", json!(bootcamp_id))
            .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn delete_reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM reviews WHERE bootcamp_id = $1")
            .bind(bootcamp_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn average_rating(&self, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError> {
        let avg: Option<f64> = sqlx::query_scalar("SELECT AVG(rating)::float8 FROM reviews WHERE bootcamp_id = $1")
            .bind(bootcamp_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(avg)
    }

    async fn purge_reviews(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM reviews").execute(&self.pool).await?;
        Ok(())
    }
}
