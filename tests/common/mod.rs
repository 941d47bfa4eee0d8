#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use agora_api::database::DatabaseManager;
use agora_api::state::AppState;

pub const PASSWORD: &str = "correct-horse-battery";

/// One in-process server per test, on a free port, over a private
/// in-memory database.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

/// An account signed in through `/auth/:role/join`.
pub struct Session {
    pub id: String,
    pub role: &'static str,
    pub username: String,
    pub access: String,
    pub refresh: String,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let pool = DatabaseManager::connect_in_memory().await?;
        DatabaseManager::migrate(&pool).await?;

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;

        let app = agora_api::app(AppState::new(pool));
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let server = Self {
            port,
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
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

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A request with an optional bearer token.
    pub fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and decode, returning the status with the JSON body
    /// (`Value::Null` when there is none).
    pub async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = self.request(method, path, token);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        let value = if text.is_empty() { Value::Null } else { serde_json::from_str(&text)? };
        Ok((status, value))
    }

    pub async fn join(&self, role: &'static str, username: &str) -> Result<Session> {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/auth/{}/join", role),
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "join {} failed with {}: {}", username, status, body);
        session(role, &body)
    }
}

pub fn session(role: &'static str, body: &Value) -> Result<Session> {
    let text = |v: &Value| v.as_str().map(str::to_string).with_context(|| format!("unexpected body: {}", body));
    Ok(Session {
        id: text(&body["id"])?,
        role,
        username: text(&body["username"])?,
        access: text(&body["token"]["access"])?,
        refresh: text(&body["token"]["refresh"])?,
    })
}
