use anyhow::Context as _;
use clap::Subcommand;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::cli::{utils::output_success, OutputFormat};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::models::{Bootcamp, BootcampInput, Course, CourseInput, Review, ReviewInput, Role, User};
use crate::services::aggregate::{refresh_average_cost, refresh_average_rating};

#[derive(Subcommand)]
pub enum SeedCommands {
    #[command(about = "Load users, bootcamps, courses and reviews from JSON files")]
    Import {
        #[arg(long, default_value = "_data", help = "Directory holding the fixture files")]
        dir: PathBuf,
    },

    #[command(about = "Delete every user, bootcamp, course and review")]
    Destroy,
}

#[derive(Debug, Deserialize)]
struct UserFixture {
    #[serde(alias = "_id")]
    id: String,
    name: String,
    email: String,
    #[serde(default)]
    role: Role,
    password: String,
}

#[derive(Debug, Deserialize)]
struct BootcampFixture {
    #[serde(alias = "_id")]
    id: String,
    user: String,
    #[serde(flatten)]
    input: BootcampInput,
}

#[derive(Debug, Deserialize)]
struct ChildFixture<T> {
    #[serde(alias = "_id")]
    id: String,
    bootcamp: String,
    user: String,
    #[serde(flatten)]
    input: T,
}

/// Fixture files use arbitrary string ids; each one maps to a stable UUID for
/// the duration of an import.
#[derive(Default)]
struct IdMap(HashMap<String, Uuid>);

impl IdMap {
    fn resolve(&mut self, key: &str) -> Uuid {
        *self
            .0
            .entry(key.to_string())
            .or_insert_with(|| Uuid::parse_str(key).unwrap_or_else(|_| Uuid::new_v4()))
    }
}

pub async fn handle(cmd: SeedCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = AppContext::build(AppConfig::from_env()).await?;
    let result = match cmd {
        SeedCommands::Import { dir } => import(&ctx, &dir, &output_format).await,
        SeedCommands::Destroy => destroy(&ctx, &output_format).await,
    };
    ctx.shutdown().await;
    result
}

fn read_fixture<T: DeserializeOwned>(dir: &Path, name: &str) -> anyhow::Result<Vec<T>> {
    let path = dir.join(name);
    let raw = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

async fn import(ctx: &AppContext, dir: &Path, output_format: &OutputFormat) -> anyhow::Result<()> {
    let users: Vec<UserFixture> = read_fixture(dir, "users.json")?;
    let bootcamps: Vec<BootcampFixture> = read_fixture(dir, "bootcamps.json")?;
    let courses: Vec<ChildFixture<CourseInput>> = read_fixture(dir, "courses.json")?;
    let reviews: Vec<ChildFixture<ReviewInput>> = read_fixture(dir, "reviews.json")?;

    let stores = &ctx.stores;
    let mut ids = IdMap::default();
    let mut touched = BTreeSet::new();

    for fixture in &users {
        let mut user = User::new(
            fixture.name.clone(),
            fixture.email.to_lowercase(),
            fixture.role,
            hash_password(&fixture.password)?,
        );
        user.id = ids.resolve(&fixture.id);
        stores.users.insert_user(&user).await?;
    }

    for fixture in bootcamps {
        let owner = ids.resolve(&fixture.user);
        let mut bootcamp = Bootcamp::from_input(fixture.input, owner)
            .with_context(|| format!("invalid bootcamp {}", fixture.id))?;
        bootcamp.id = ids.resolve(&fixture.id);
        bootcamp.location = match ctx.geocoder.geocode(&bootcamp.address).await {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!("Geocoding failed for {}: {}", bootcamp.name, e);
                None
            }
        };
        stores.bootcamps.insert_bootcamp(&bootcamp, &|_| true).await?;
    }

    for fixture in courses {
        let bootcamp_id = ids.resolve(&fixture.bootcamp);
        let mut course = Course::from_input(fixture.input, bootcamp_id, ids.resolve(&fixture.user))
            .with_context(|| format!("invalid course {}", fixture.id))?;
        course.id = ids.resolve(&fixture.id);
        stores.courses.insert_course(&course).await?;
        touched.insert(bootcamp_id);
    }

    for fixture in reviews {
        let bootcamp_id = ids.resolve(&fixture.bootcamp);
        let mut review = Review::from_input(fixture.input, bootcamp_id, ids.resolve(&fixture.user))
            .with_context(|| format!("invalid review {}", fixture.id))?;
        review.id = ids.resolve(&fixture.id);
        stores.reviews.insert_review(&review).await?;
        touched.insert(bootcamp_id);
    }

    for bootcamp_id in &touched {
        refresh_average_cost(stores, *bootcamp_id).await;
        refresh_average_rating(stores, *bootcamp_id).await;
    }

    output_success(
        output_format,
        "Data imported",
        Some(json!({ "users": users.len(), "bootcamps_updated": touched.len() })),
    )
}

async fn destroy(ctx: &AppContext, output_format: &OutputFormat) -> anyhow::Result<()> {
    let stores = &ctx.stores;
    stores.reviews.purge_reviews().await?;
    stores.courses.purge_courses().await?;
    stores.bootcamps.purge_bootcamps().await?;
    stores.users.purge_users().await?;
    output_success(output_format, "Data destroyed", None)
}
