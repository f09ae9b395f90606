use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, header};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use time::{OffsetDateTime, UtcOffset};
use time::format_description;
use tracing::info;

use crate::settings;
use crate::workspace;

use super::generate::{ServerError, generate_request};
use super::models::HealthResponse;
use super::state::ServerState;

pub async fn run_server(settings: settings::Settings, offset: UtcOffset) -> Result<()> {
    let addr = settings.server.addr();
    let state = Arc::new(ServerState::new(settings)?.with_offset(offset));
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address: {}", addr))?;
    info!("listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn router(state: Arc<ServerState>) -> Router {
    let body_limit = state.settings.server.body_limit_bytes();
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/gerar-pdf", post(generate_pdf))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}

async fn index(State(state): State<Arc<ServerState>>) -> Html<String> {
    Html(state.index_html.clone())
}

async fn health(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            logo_exists: workspace::logo_exists(&state.settings.paths),
        }),
    )
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
    headers.insert(
        "access-control-expose-headers",
        HeaderValue::from_static("content-disposition,x-report-pages,x-skipped-photos"),
    );
}

async fn generate_pdf(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Response<Body>, ServerError> {
    let offset = state.offset;
    let state = state.clone();
    let report = tokio::task::spawn_blocking(move || generate_request(state.as_ref(), &body))
        .await
        .map_err(|err| ServerError::internal(format!("server task failed: {}", err), "JoinError"))??;

    let filename = report_filename(OffsetDateTime::now_utc().to_offset(offset))?;
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .header("x-report-pages", report.pages)
        .header("x-skipped-photos", report.skipped)
        .body(Body::from(report.pdf))
        .context("failed to build pdf response")?;
    Ok(response)
}

fn report_filename(now: OffsetDateTime) -> Result<String> {
    let format = format_description::parse("[year][month][day]_[hour][minute][second]")
        .context("invalid filename time format")?;
    let stamp = now.format(&format).context("failed to format timestamp")?;
    Ok(format!("relatorio_{}.pdf", stamp))
}
