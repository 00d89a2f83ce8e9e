#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use devcamper_api::auth::password::hash_password;
use devcamper_api::config::AppConfig;
use devcamper_api::models::{Location, Role, User};
use devcamper_api::services::email::{EmailError, EmailMessage, EmailSender};
use devcamper_api::services::geocoder::{GeocodeError, Geocoder};
use devcamper_api::store::Stores;
use devcamper_api::AppContext;

pub const PASSWORD: &str = "123456";

/// Keeps every message; can be told to fail after recording.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: AtomicBool,
}

impl RecordingMailer {
    pub fn last(&self) -> Option<EmailMessage> {
        self.sent.lock().ok()?.last().cloned()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmailError::NotConfigured("test relay"));
        }
        Ok(())
    }
}

/// Resolves a handful of known places: Boston and Worcester, MA.
pub struct FixedGeocoder;

pub const BOSTON: [f64; 2] = [-71.104028, 42.350846];
pub const WORCESTER: [f64; 2] = [-71.802293, 42.262593];

fn point(coordinates: [f64; 2], city: &str, zipcode: &str) -> Location {
    Location {
        kind: "Point".to_string(),
        coordinates,
        formatted_address: Some(format!("{}, MA {}, US", city, zipcode)),
        street: None,
        city: Some(city.to_string()),
        state: Some("MA".to_string()),
        zipcode: Some(zipcode.to_string()),
        country: Some("US".to_string()),
    }
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Location>, GeocodeError> {
        Ok(if address.contains("Boston") || address.contains("02215") {
            Some(point(BOSTON, "Boston", "02215"))
        } else if address.contains("Worcester") || address.contains("01609") {
            Some(point(WORCESTER, "Worcester", "01609"))
        } else {
            None
        })
    }
}

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub ctx: AppContext,
    pub mailer: Arc<RecordingMailer>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// Register through the API and return the bearer token.
    pub async fn register(&self, name: &str, email: &str, role: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "name": name, "email": email, "password": PASSWORD, "role": role }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register {} failed: {}", email, res.status());
        token_of(res).await
    }

    /// Admins cannot self-register; insert one directly and log in.
    pub async fn admin(&self, email: &str) -> Result<String> {
        let user = User::new("Admin".to_string(), email.to_string(), Role::Admin, hash_password(PASSWORD)?);
        self.ctx.stores.users.insert_user(&user).await?;
        self.login(email, PASSWORD).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login {} failed: {}", email, res.status());
        token_of(res).await
    }

    /// POST a bootcamp and return the response status and body.
    pub async fn create_bootcamp(&self, token: &str, name: &str, address: &str) -> Result<(StatusCode, Value)> {
        self.send(
            self.client.post(self.url("/api/v1/bootcamps")).bearer_auth(token).json(&bootcamp_body(name, address)),
        )
        .await
    }

    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, Value)> {
        let res = request.send().await?;
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }
}

pub fn bootcamp_body(name: &str, address: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{} is a full stack bootcamp", name),
        "website": "https://devworks.com",
        "phone": "(111) 111-1111",
        "email": "enroll@devworks.com",
        "address": address,
        "careers": ["Web Development", "UI/UX"],
        "housing": true,
        "jobAssistance": true,
        "jobGuarantee": false,
        "acceptGi": true
    })
}

pub fn course_body(title: &str, tuition: f64) -> Value {
    json!({
        "title": title,
        "description": "Learn the full stack",
        "weeks": 12,
        "tuition": tuition,
        "minimumSkill": "beginner",
        "scholarshipAvailable": false
    })
}

pub fn review_body(title: &str, rating: i32) -> Value {
    json!({ "title": title, "text": "Learned a lot here", "rating": rating })
}

pub async fn token_of(res: reqwest::Response) -> Result<String> {
    let body = res.json::<Value>().await?;
    body.get("token")
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("missing token: {}", body))
}

pub fn id_of(body: &Value) -> Result<String> {
    body["data"]["id"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("missing data.id: {}", body))
}

/// Boot the router on a free port with a fresh in-memory store.
pub async fn spawn() -> Result<TestServer> {
    spawn_with(|_| {}).await
}

/// Like `spawn`, with the development config adjusted first.
pub async fn spawn_with(adjust: impl FnOnce(&mut AppConfig)) -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let mut config = AppConfig::development();
    adjust(&mut config);
    config.server.host = "127.0.0.1".to_string();
    config.server.port = port;

    let mailer = Arc::new(RecordingMailer::default());
    let ctx = AppContext::with_parts(config, Stores::memory(), mailer.clone(), Arc::new(FixedGeocoder));

    let listener = tokio::net::TcpListener::bind(ctx.config.addr())
        .await
        .context("failed to bind test listener")?;
    let app = devcamper_api::app(ctx.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;
    });

    let server = TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        ctx,
        mailer,
    };
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}
