//! # HTTP Control Surface
//!
//! A slim web front end over the job scheduler: a print form, a JSON status
//! endpoint mirroring the job/connection event data, and cancellation.
//!
//! ## Usage
//!
//! ```bash
//! tinta serve --listen 0.0.0.0:8080 --device AA:BB:CC:DD:EE:FF
//! ```
//!
//! Job submission is non-blocking: the handler enqueues and returns the job
//! id; progress is polled via `GET /status`.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::connection::ConnectionManager;
use crate::error::TintaError;
use crate::job::JobScheduler;
use crate::printer::PrintSettings;
use crate::render::ContentDescriptor;
use crate::render::glyph::FontSize;
use crate::render::text::TextOptions;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g. "0.0.0.0:8080")
    pub listen_addr: String,
}

/// Shared handler state.
pub struct AppState {
    pub scheduler: JobScheduler,
    pub connection: ConnectionManager,
    pub defaults: PrintSettings,
}

/// Form data submitted by the user.
#[derive(Debug, Deserialize)]
pub struct PrintForm {
    pub text: String,
    pub darkness: Option<u8>,
}

#[derive(Debug, Serialize)]
struct JobView {
    id: String,
    status: String,
    frames_sent: usize,
    frames_total: usize,
}

#[derive(Debug, Serialize)]
struct StatusView {
    connection: String,
    printer: Option<String>,
    job: Option<JobView>,
}

/// Start the HTTP server. Runs until the process exits.
pub async fn serve(state: AppState, config: ServerConfig) -> Result<(), TintaError> {
    let shared = Arc::new(state);

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/print", post(print_handler))
        .route("/status", get(status_handler))
        .route("/cancel", post(cancel_handler))
        .with_state(shared);

    log::info!("http control surface on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| TintaError::Io(std::io::Error::other(format!(
            "failed to bind {}: {}",
            config.listen_addr, e
        ))))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| TintaError::Io(std::io::Error::other(format!("server error: {}", e))))?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(HTML_FORM)
}

async fn print_handler(State(state): State<Arc<AppState>>, Form(form): Form<PrintForm>) -> Response {
    if form.text.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "text cannot be empty").into_response();
    }

    let darkness = form.darkness.unwrap_or(state.defaults.darkness).min(20);
    let descriptor = ContentDescriptor::Text {
        content: form.text,
        font: FontSize::Medium,
        options: TextOptions::default(),
        darkness,
    };
    let settings = PrintSettings {
        darkness,
        ..state.defaults
    };

    match state.scheduler.submit(descriptor, settings) {
        Ok(id) => Json(serde_json::json!({ "job": id.to_string() })).into_response(),
        Err(TintaError::Busy) => {
            (StatusCode::CONFLICT, "printer busy, try again later").into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusView> {
    let job = state.scheduler.latest().map(|job| JobView {
        id: job.id.to_string(),
        status: job.status.to_string(),
        frames_sent: job.progress.frames_sent,
        frames_total: job.progress.frames_total,
    });
    Json(StatusView {
        connection: state.connection.state().to_string(),
        printer: state.connection.descriptor().map(|d| d.name),
        job,
    })
}

async fn cancel_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.scheduler.active_job() {
        Some(id) => {
            state.scheduler.cancel(id);
            Json(serde_json::json!({ "cancelled": id.to_string() })).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no active job").into_response(),
    }
}

/// Minimal print form.
const HTML_FORM: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>tinta</title>
    <style>
        body { font-family: sans-serif; max-width: 480px; margin: 40px auto; }
        textarea { width: 100%; min-height: 140px; font-family: monospace; }
        input[type="number"] { width: 60px; }
        button { padding: 8px 24px; }
    </style>
</head>
<body>
    <h1>tinta</h1>
    <form method="POST" action="/print">
        <p><textarea name="text" required placeholder="Text to print"></textarea></p>
        <p><label>Darkness (0-20): <input type="number" name="darkness" min="0" max="20" value="10"></label></p>
        <button type="submit">Print</button>
    </form>
    <p><a href="/status">status</a></p>
</body>
</html>"#;
