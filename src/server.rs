//! Ingestion endpoint.
//!
//! A thin HTTP surface over the scrape client: one route that logs in,
//! fetches a profile, upserts the flat record into the profile store, and
//! echoes the extracted fields back. Core failures are not translated into a
//! bespoke error vocabulary; they surface as a 500 carrying the error chain.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::config::{self, ResolvedConfig};
use crate::scraper::{Account, Client, Credentials};
use crate::storage::{ProfileRecord, ProfileStore};

#[derive(Clone)]
pub struct AppState {
    config: Arc<ResolvedConfig>,
    store: Arc<dyn ProfileStore>,
}

impl AppState {
    pub fn new(config: ResolvedConfig, store: Arc<dyn ProfileStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

/// Wire shape of the ingestion request, preserved from the original service:
/// the payload nests everything under a `body` key.
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub body: ProfileRequestBody,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequestBody {
    /// Login username; falls back to the environment when absent.
    #[serde(default)]
    pub username: Option<String>,
    /// Login password; falls back to the environment when absent.
    #[serde(default)]
    pub password: Option<String>,
    /// Target profile to fetch.
    pub profile: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/profile", post(post_profile))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and run the ingestion endpoint until the task is stopped.
pub async fn serve(config: ResolvedConfig, store: Arc<dyn ProfileStore>) -> anyhow::Result<()> {
    let bind = config.server.bind.clone();
    let app = router(AppState::new(config, store));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!(addr = %bind, "ingestion endpoint listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn post_profile(
    State(state): State<AppState>,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<Account>, AppError> {
    let account = fetch_profile(&state, request.body).await?;
    Ok(Json(account))
}

async fn fetch_profile(state: &AppState, body: ProfileRequestBody) -> anyhow::Result<Account> {
    let credentials = match (body.username, body.password) {
        (Some(username), Some(password)) => Credentials::new(username, password),
        _ => config::env_credentials()
            .context("no credentials in request body or environment")?,
    };

    let scrape = &state.config.scrape;
    let mut client = Client::new(state.config.session_cache()?)
        .with_credentials(credentials)
        .with_base_url(scrape.base_url.clone())
        .with_pacing(scrape.delay.strategy());
    if let Some(user_agent) = &scrape.user_agent {
        client = client.with_user_agent(user_agent.clone());
    }

    client.login(false).await?;

    // Let the fresh session settle before the first fetch.
    tokio::time::sleep(scrape.post_login_pause()).await;

    let account = client.get_account(&body.profile).await?;
    state
        .store
        .upsert(&ProfileRecord::from_account(&account))
        .await?;

    Ok(account)
}

/// Anyhow wrapper so handler errors become plain 500 responses.
struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = format!("{:#}", self.0), "profile ingestion failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", self.0)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
