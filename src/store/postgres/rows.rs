use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{Bootcamp, Career, Course, Location, Review, Role, User};
use crate::store::StoreError;

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub password_hash: String,
    pub reset_password_token: Option<String>,
    pub reset_password_expire: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role.parse::<Role>().map_err(StoreError::Corrupt)?,
            password_hash: row.password_hash,
            reset_password_token: row.reset_password_token,
            reset_password_expire: row.reset_password_expire,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct BootcampRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub location_lng: Option<f64>,
    pub location_lat: Option<f64>,
    pub location_formatted_address: Option<String>,
    pub location_street: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_zipcode: Option<String>,
    pub location_country: Option<String>,
    pub careers: Vec<String>,
    pub average_rating: Option<f64>,
    pub average_cost: Option<i64>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
}

impl TryFrom<BootcampRow> for Bootcamp {
    type Error = StoreError;

    fn try_from(row: BootcampRow) -> Result<Self, Self::Error> {
        let careers = row
            .careers
            .iter()
            .map(|c| c.parse::<Career>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Corrupt)?;
        let location = match (row.location_lng, row.location_lat) {
            (Some(lng), Some(lat)) => Some(Location {
                kind: "Point".to_string(),
                coordinates: [lng, lat],
                formatted_address: row.location_formatted_address,
                street: row.location_street,
                city: row.location_city,
                state: row.location_state,
                zipcode: row.location_zipcode,
                country: row.location_country,
            }),
            _ => None,
        };
        Ok(Bootcamp {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            website: row.website,
            phone: row.phone,
            email: row.email,
            address: row.address,
            location,
            careers,
            average_rating: row.average_rating,
            average_cost: row.average_cost,
            photo: row.photo,
            housing: row.housing,
            job_assistance: row.job_assistance,
            job_guarantee: row.job_guarantee,
            accept_gi: row.accept_gi,
            created_at: row.created_at,
            owner_id: row.user_id,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct CourseRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: f64,
    pub minimum_skill: String,
    pub scholarship_available: bool,
    pub created_at: DateTime<Utc>,
    pub bootcamp_id: Uuid,
    pub user_id: Uuid,
}

impl TryFrom<CourseRow> for Course {
    type Error = StoreError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        Ok(Course {
            id: row.id,
            title: row.title,
            description: row.description,
            weeks: row.weeks,
            tuition: row.tuition,
            minimum_skill: row.minimum_skill.parse().map_err(StoreError::Corrupt)?,
            scholarship_available: row.scholarship_available,
            created_at: row.created_at,
            bootcamp_id: row.bootcamp_id,
            owner_id: row.user_id,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub bootcamp_id: Uuid,
    pub user_id: Uuid,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            title: row.title,
            text: row.text,
            rating: row.rating,
            created_at: row.created_at,
            bootcamp_id: row.bootcamp_id,
            owner_id: row.user_id,
        }
    }
}

pub fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
