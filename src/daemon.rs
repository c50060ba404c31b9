use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;
use crate::error::{ReminderBotError, Result};
use crate::jobs::delivery_job_from_config;
use crate::reminders::{parse_due_at, Reminder, ReminderStore};
use crate::scheduler::Scheduler;
use crate::services::reminders::{offset_from, ReminderService};
use crate::units::parse_offset;

#[derive(Clone)]
pub struct AppState {
    pub service: ReminderService,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    git_sha: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: i64,
}

/// Exactly one of `due_at`, `in` or `due_offset_seconds` picks the due time; at most
/// one of `every` or `repeat_seconds` makes it recurring.
#[derive(Deserialize)]
struct CreateReminderRequest {
    user_id: i64,
    message: String,
    due_at: Option<String>,
    #[serde(rename = "in")]
    in_: Option<String>,
    due_offset_seconds: Option<i64>,
    every: Option<String>,
    repeat_seconds: Option<i64>,
}

#[derive(Serialize)]
struct ReminderListResponse {
    reminders: Vec<Reminder>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/reminders",
            get(list_reminders)
                .post(create_reminder)
                .delete(delete_all_reminders),
        )
        .route("/reminders/{id}", delete(delete_reminder))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_sha: env!("REMINDER_BOT_GIT_SHA").to_string(),
    })
}

async fn create_reminder(
    State(state): State<AppState>,
    Json(payload): Json<CreateReminderRequest>,
) -> Response {
    let result = async {
        let repeat = repeat_seconds(payload.every.as_deref(), payload.repeat_seconds)?;
        let due_at = match (
            payload.due_at.as_deref(),
            payload.in_.as_deref(),
            payload.due_offset_seconds,
        ) {
            (Some(raw), None, None) => parse_due_at(raw)?,
            (None, Some(token), None) => offset_from(Utc::now(), parse_offset(token)?)?,
            (None, None, Some(seconds)) => offset_from(Utc::now(), seconds)?,
            _ => {
                return Err(ReminderBotError::Validation(
                    "give exactly one of due_at, in or due_offset_seconds".to_string(),
                ))
            }
        };
        state
            .service
            .create_reminder_at(payload.user_id, &payload.message, due_at, repeat)
            .await
    }
    .await;

    match result {
        Ok(reminder) => (StatusCode::CREATED, Json(reminder)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_reminders(State(state): State<AppState>, Query(query): Query<UserQuery>) -> Response {
    match state.service.list_reminders(query.user_id).await {
        Ok(reminders) => (StatusCode::OK, Json(ReminderListResponse { reminders })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn delete_reminder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<UserQuery>,
) -> Response {
    match state.service.delete_reminder(query.user_id, id).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok", "deleted": id}))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn delete_all_reminders(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Response {
    match state.service.delete_all_reminders(query.user_id).await {
        Ok(deleted) => {
            (StatusCode::OK, Json(json!({"status": "ok", "deleted": deleted}))).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn repeat_seconds(every: Option<&str>, repeat_seconds: Option<i64>) -> Result<Option<i64>> {
    match (every, repeat_seconds) {
        (Some(_), Some(_)) => Err(ReminderBotError::Validation(
            "give at most one of every or repeat_seconds".to_string(),
        )),
        (Some(token), None) => parse_offset(token).map(Some),
        (None, seconds) => Ok(seconds),
    }
}

fn error_response(err: ReminderBotError) -> Response {
    let status = match &err {
        err if err.is_client_error() => StatusCode::BAD_REQUEST,
        ReminderBotError::NotFound(_) => StatusCode::NOT_FOUND,
        ReminderBotError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// Runs the delivery scheduler and the HTTP API until Ctrl-C.
pub async fn run(config: Config, db_path: &str) -> Result<()> {
    run_until(config, db_path, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
    })
    .await
}

pub async fn run_until(
    config: Config,
    db_path: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let store = Arc::new(ReminderStore::new(db_path).await?);
    let job = delivery_job_from_config(&config, store.clone())?;

    let addr = format!("{}:{}", config.daemon.host, config.daemon.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ReminderBotError::Runtime(format!("cannot bind {addr}: {e}")))?;

    let mut scheduler = Scheduler::new();
    scheduler.register_job(Arc::new(job));
    scheduler.start();

    let state = AppState {
        service: ReminderService::new(store),
    };
    let app = build_router(state);
    tracing::info!(
        addr = %addr,
        db_path,
        poll_seconds = config.scheduler.poll_seconds,
        "Reminder daemon listening"
    );

    let shutdown = async move {
        shutdown.await;
        scheduler.stop().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ReminderBotError::Runtime(e.to_string()))?;

    Ok(())
}
