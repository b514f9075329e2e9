use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use server_api::{dispatch_form, load_tasks, ApiContext};
use shared::{
    domain::{Theme, View},
    error::{ApiError, ErrorCode},
    protocol::TaskList,
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, info_span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod app_state;
mod config;
mod render;
mod theme;

use app_state::AppState;
use config::{load_settings, prepare_database_url};
use theme::{resolve_theme, safe_redirect_target, theme_cookie};

const MAX_FORM_BYTES: usize = 16 * 1024;

type ApiFailure = (StatusCode, Json<ApiError>);

#[derive(Debug, Deserialize)]
struct ViewQuery {
    view: Option<String>,
}

impl ViewQuery {
    fn view(&self) -> View {
        View::parse(self.view.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ThemeForm {
    theme: Option<String>,
    redirect_to: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    let database_url = prepare_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext::new(storage),
        cookie_secure: settings.cookie_secure,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "todo server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index).post(submit_intent))
        .route("/tasks", get(list_tasks))
        .route("/theme", post(set_theme))
        .route("/healthz", get(healthz))
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = Uuid::new_v4();
                info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiFailure> {
    state.api.storage.health_check().await.map_err(|e| {
        error!(error = %e, "health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn index(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ViewQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiFailure> {
    let theme = resolve_theme(&headers);
    let list = load_tasks(&state.api, q.view()).await.map_err(api_failure)?;
    let html = render::render_page(&list, theme);

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response_headers.insert(header::VARY, HeaderValue::from_static("Cookie"));
    Ok((StatusCode::OK, response_headers, html).into_response())
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ViewQuery>,
) -> Result<Json<TaskList>, ApiFailure> {
    let list = load_tasks(&state.api, q.view()).await.map_err(api_failure)?;
    Ok(Json(list))
}

/// One intent per submission. Browsers get redirected back to the list;
/// callers that accept JSON get the acknowledgment body.
async fn submit_intent(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ViewQuery>,
    headers: HeaderMap,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, ApiFailure> {
    let ack = dispatch_form(&state.api, &fields)
        .await
        .map_err(api_failure)?;

    if wants_json(&headers) {
        return Ok(Json(ack).into_response());
    }
    Ok(Redirect::to(&format!("/?view={}", q.view())).into_response())
}

async fn set_theme(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ThemeForm>,
) -> Result<Response, ApiFailure> {
    let theme = form.theme.as_deref().and_then(Theme::parse).ok_or_else(|| {
        api_failure(ApiError::validation(
            "theme must be one of `light`, `dark`, `system`",
        ))
    })?;
    info!(%theme, "theme updated");

    let target = safe_redirect_target(form.redirect_to.as_deref());
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, theme_cookie(theme, state.cookie_secure));
    headers.insert(
        header::LOCATION,
        HeaderValue::from_str(&target).unwrap_or_else(|_| HeaderValue::from_static("/")),
    );
    Ok((StatusCode::SEE_OTHER, headers).into_response())
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|accept| accept.contains("application/json"))
}

fn api_failure(err: ApiError) -> ApiFailure {
    let status =
        StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
