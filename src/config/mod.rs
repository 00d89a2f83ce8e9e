use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub email: EmailConfig,
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL used when building links sent by email. Falls back to
    /// the request's Host header when unset.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://...` or the literal `memory` for the in-process store.
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub max_request_size_bytes: usize,
    /// Requests allowed per client IP in each window; zero turns limiting off.
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cookie_expiry_days: u64,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub transport: EmailTransport,
    pub from_name: String,
    pub from_email: String,
    pub relay_url: Option<String>,
    #[serde(skip_serializing)]
    pub relay_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailTransport {
    Log,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub provider: GeocoderProvider,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocoderProvider {
    Disabled,
    Mapquest,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
        .with_production_invariants()
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Production never sends the token cookie over plain HTTP, whatever the
    /// environment says.
    fn with_production_invariants(mut self) -> Self {
        if self.is_production() {
            self.security.secure_cookies = true;
        }
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("DEVCAMPER_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("PUBLIC_URL") {
            self.server.public_url = Some(v.trim_end_matches('/').to_string());
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("RATE_LIMIT_REQUESTS") {
            self.api.rate_limit_requests = v.parse().unwrap_or(self.api.rate_limit_requests);
        }
        if let Ok(v) = env::var("RATE_LIMIT_WINDOW_SECS") {
            self.api.rate_limit_window_secs = v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("JWT_COOKIE_LIFETIME_DAYS") {
            self.security.cookie_expiry_days = v.parse().unwrap_or(self.security.cookie_expiry_days);
        }
        if let Ok(v) = env::var("SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }

        // Email overrides
        if let Ok(v) = env::var("EMAIL_TRANSPORT") {
            self.email.transport = match v.as_str() {
                "http" => EmailTransport::Http,
                _ => EmailTransport::Log,
            };
        }
        if let Ok(v) = env::var("FROM_NAME") {
            self.email.from_name = v;
        }
        if let Ok(v) = env::var("FROM_EMAIL") {
            self.email.from_email = v;
        }
        if let Ok(v) = env::var("EMAIL_RELAY_URL") {
            self.email.relay_url = Some(v);
        }
        if let Ok(v) = env::var("EMAIL_RELAY_TOKEN") {
            self.email.relay_token = Some(v);
        }

        // Geocoder overrides
        if let Ok(v) = env::var("GEOCODER_PROVIDER") {
            self.geocoder.provider = match v.as_str() {
                "mapquest" => GeocoderProvider::Mapquest,
                _ => GeocoderProvider::Disabled,
            };
        }
        if let Ok(v) = env::var("GEOCODER_API_KEY") {
            self.geocoder.api_key = Some(v);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                public_url: None,
            },
            database: DatabaseConfig {
                url: "memory".to_string(),
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            api: ApiConfig {
                default_page_size: 25,
                max_page_size: 1000,
                max_request_size_bytes: 10 * 1024, // 10kb
                rate_limit_requests: 100,
                rate_limit_window_secs: 15 * 60,
            },
            security: SecurityConfig {
                jwt_secret: "development-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 30,
                cookie_expiry_days: 30,
                secure_cookies: false,
            },
            email: EmailConfig {
                transport: EmailTransport::Log,
                from_name: "DevCamper".to_string(),
                from_email: "noreply@devcamper.io".to_string(),
                relay_url: None,
                relay_token: None,
            },
            geocoder: GeocoderConfig {
                provider: GeocoderProvider::Disabled,
                api_key: None,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.url = String::new();
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.api.max_page_size = 500;
        config.security.jwt_secret = String::new();
        config.security.jwt_expiry_hours = 24 * 7;
        config.security.cookie_expiry_days = 7;
        config.security.secure_cookies = true;
        config
    }

    fn production() -> Self {
        let mut config = Self::staging();
        config.environment = Environment::Production;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.database.run_migrations = false;
        config.api.max_page_size = 100;
        config
    }
}
