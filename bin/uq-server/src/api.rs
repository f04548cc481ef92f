//! Thin user API: JSON in, use case call, JSON out. Routing stays minimal;
//! the interesting work happens in the async chain behind the publisher.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use uq_user::domain::User;
use uq_user::service::{CreateUserRequest, ImageUpload, UserService, VerificationService};
use uq_user::UserError;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub verifications: Arc<VerificationService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/v1/users", post(create_user_handler))
        .route("/v1/users/:uuid", get(get_user_handler))
        .route("/v1/users/:uuid/verify", post(verify_email_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageBody {
    content_type: String,
    content: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserBody {
    name: String,
    email: String,
    password: String,
    job_title: Option<String>,
    #[serde(default)]
    skills: Vec<String>,
    image: Option<ImageBody>,
}

#[derive(Debug, Deserialize)]
struct VerifyEmailBody {
    code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    uuid: String,
    name: String,
    email: String,
    job_title: Option<String>,
    skills: Vec<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            uuid: user.uuid,
            name: user.name,
            email: user.email,
            job_title: user.job_title,
            skills: user.skills,
            image_url: user.image_url,
            created_at: user.created_at,
        }
    }
}

async fn create_user_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> Result<(StatusCode, Json<UserResponse>), StatusCode> {
    let request = CreateUserRequest {
        name: body.name,
        email: body.email,
        password: body.password,
        job_title: body.job_title,
        skills: body.skills,
        image: body.image.map(|image| ImageUpload {
            content_type: image.content_type,
            content: image.content,
            name: image.name,
        }),
    };

    let user = state.users.create_user(request).await.map_err(status_for)?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn get_user_handler(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<UserResponse>, StatusCode> {
    let user = state.users.get_user(&uuid).await.map_err(status_for)?;
    Ok(Json(user.into()))
}

async fn verify_email_handler(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Json(body): Json<VerifyEmailBody>,
) -> Result<StatusCode, StatusCode> {
    state
        .verifications
        .verify_email(&uuid, &body.code)
        .await
        .map_err(status_for)?;
    Ok(StatusCode::NO_CONTENT)
}

fn status_for(err: UserError) -> StatusCode {
    match err {
        UserError::UserNotFound { .. } | UserError::VerificationNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        UserError::InvalidCode { .. } => StatusCode::BAD_REQUEST,
        // The user row may already be persisted when a publish fails; 502
        // tells the caller the request did not fully take effect.
        UserError::Messaging(_) => StatusCode::BAD_GATEWAY,
        other => {
            error!(error = %other, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn ready_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "READY"
    }))
}
