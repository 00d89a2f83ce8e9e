use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::{check_max_len, is_valid_email, is_valid_http_url, require_text, slugify, ValidationErrors};

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_PHONE_LEN: usize = 20;
pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Career {
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "UI/UX")]
    UiUx,
    #[serde(rename = "Data Science")]
    DataScience,
    #[serde(rename = "Business")]
    Business,
    #[serde(rename = "Other")]
    Other,
}

impl Career {
    pub fn as_str(&self) -> &'static str {
        match self {
            Career::WebDevelopment => "Web Development",
            Career::MobileDevelopment => "Mobile Development",
            Career::UiUx => "UI/UX",
            Career::DataScience => "Data Science",
            Career::Business => "Business",
            Career::Other => "Other",
        }
    }
}

impl FromStr for Career {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Web Development" => Ok(Career::WebDevelopment),
            "Mobile Development" => Ok(Career::MobileDevelopment),
            "UI/UX" => Ok(Career::UiUx),
            "Data Science" => Ok(Career::DataScience),
            "Business" => Ok(Career::Business),
            "Other" => Ok(Career::Other),
            other => Err(format!("`{}` is not a valid career", other)),
        }
    }
}

/// GeoJSON point plus the address parts returned by the geocoder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl Location {
    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    /// Central angle in radians between this point and another (haversine).
    pub fn angle_to(&self, longitude: f64, latitude: f64) -> f64 {
        let (lat1, lat2) = (self.latitude().to_radians(), latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (longitude - self.longitude()).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * a.sqrt().min(1.0).asin()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub location: Option<Location>,
    pub careers: Vec<Career>,
    pub average_rating: Option<f64>,
    pub average_cost: Option<i64>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "user")]
    pub owner_id: Uuid,
}

/// The `{id, name, description}` projection embedded in courses and reviews.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BootcampSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<&Bootcamp> for BootcampSummary {
    fn from(b: &Bootcamp) -> Self {
        Self {
            id: b.id,
            name: b.name.clone(),
            description: b.description.clone(),
        }
    }
}

/// Create/update body. Owner, slug, location and the derived averages are
/// never taken from the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootcampInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<String>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

fn parse_careers(raw: Vec<String>, errors: &mut ValidationErrors) -> Vec<Career> {
    let mut careers = Vec::with_capacity(raw.len());
    for value in raw {
        match value.parse::<Career>() {
            Ok(c) if !careers.contains(&c) => careers.push(c),
            Ok(_) => {}
            Err(msg) => errors.add("careers", msg),
        }
    }
    careers
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Bootcamp {
    pub fn from_input(input: BootcampInput, owner_id: Uuid) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = require_text(input.name, "name", "Please provide a name for the bootcamp", &mut errors);
        let description = require_text(
            input.description,
            "description",
            "Please provide a description for the bootcamp",
            &mut errors,
        );
        let address = require_text(input.address, "address", "Please provide an address for the bootcamp", &mut errors);
        let careers = match input.careers {
            Some(raw) => parse_careers(raw, &mut errors),
            None => Vec::new(),
        };

        let bootcamp = Self {
            id: Uuid::new_v4(),
            slug: slugify(&name),
            name,
            description,
            website: optional_text(input.website),
            phone: optional_text(input.phone),
            email: optional_text(input.email),
            address,
            location: None,
            careers,
            average_rating: None,
            average_cost: None,
            photo: DEFAULT_PHOTO.to_string(),
            housing: input.housing.unwrap_or(false),
            job_assistance: input.job_assistance.unwrap_or(false),
            job_guarantee: input.job_guarantee.unwrap_or(false),
            accept_gi: input.accept_gi.unwrap_or(false),
            created_at: Utc::now(),
            owner_id,
        };
        bootcamp.check(&mut errors);
        errors.into_result()?;
        Ok(bootcamp)
    }

    /// Apply the present fields of `input` and revalidate the whole record.
    pub fn apply_update(&mut self, input: BootcampInput) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = input.name {
            self.name = name.trim().to_string();
            self.slug = slugify(&self.name);
        }
        if let Some(description) = input.description {
            self.description = description.trim().to_string();
        }
        if input.website.is_some() {
            self.website = optional_text(input.website);
        }
        if input.phone.is_some() {
            self.phone = optional_text(input.phone);
        }
        if input.email.is_some() {
            self.email = optional_text(input.email);
        }
        if let Some(address) = input.address {
            self.address = address.trim().to_string();
        }
        if let Some(raw) = input.careers {
            self.careers = parse_careers(raw, &mut errors);
        }
        if let Some(v) = input.housing {
            self.housing = v;
        }
        if let Some(v) = input.job_assistance {
            self.job_assistance = v;
        }
        if let Some(v) = input.job_guarantee {
            self.job_guarantee = v;
        }
        if let Some(v) = input.accept_gi {
            self.accept_gi = v;
        }
        self.check(&mut errors);
        errors.into_result()
    }

    fn check(&self, errors: &mut ValidationErrors) {
        if self.name.is_empty() {
            errors.add("name", "Please provide a name for the bootcamp");
        }
        check_max_len(&self.name, MAX_NAME_LEN, "name", "Bootcamp name cannot be more than 50 characters", errors);
        if self.description.is_empty() {
            errors.add("description", "Please provide a description for the bootcamp");
        }
        check_max_len(
            &self.description,
            MAX_DESCRIPTION_LEN,
            "description",
            "Bootcamp description cannot be more than 500 characters",
            errors,
        );
        if self.address.is_empty() {
            errors.add("address", "Please provide an address for the bootcamp");
        }
        if let Some(website) = &self.website {
            if !is_valid_http_url(website) {
                errors.add("website", "Please provide a valid URL with HTTP or HTTPS");
            }
        }
        if let Some(phone) = &self.phone {
            check_max_len(phone, MAX_PHONE_LEN, "phone", "Contact number cannot be longer than 20 characters", errors);
        }
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                errors.add("email", "Please use a valid email");
            }
        }
        if self.careers.is_empty() {
            errors.add("careers", "Please provide at least one career");
        }
    }
}
