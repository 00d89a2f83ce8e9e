use anyhow::Context as _;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::email::{self, EmailSender};
use crate::services::geocoder::{self, Geocoder};
use crate::store::{postgres, Stores};

/// Everything a request handler needs, built once at startup and shared
/// through axum `State`.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub stores: Stores,
    pub mailer: Arc<dyn EmailSender>,
    pub geocoder: Arc<dyn Geocoder>,
}

impl AppContext {
    /// Connect the configured store and collaborators.
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        if config.security.jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must be set outside development");
        }

        let stores = if config.database.url == "memory" {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            Stores::memory()
        } else {
            let pool = postgres::connect(&config.database)
                .await
                .context("failed to connect to PostgreSQL")?;
            if config.database.run_migrations {
                postgres::run_migrations(&pool).await.context("failed to run migrations")?;
            }
            Stores::postgres(pool)
        };

        let mailer = email::from_config(&config.email)?;
        let geocoder = geocoder::from_config(&config.geocoder)?;

        Ok(Self::with_parts(config, stores, Arc::from(mailer), Arc::from(geocoder)))
    }

    pub fn with_parts(
        config: AppConfig,
        stores: Stores,
        mailer: Arc<dyn EmailSender>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            stores,
            mailer,
            geocoder,
        }
    }

    pub async fn shutdown(&self) {
        self.stores.close().await;
    }
}
