//! HTTP surface: routes, shared layers and the serve loop.

use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware::{self, Next},
    routing::{get, post},
    Extension, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

pub(crate) mod error;
pub mod handlers;
pub(crate) mod observe;
mod openapi;

pub use error::{set_diagnostics, ApiError};
pub use openapi::doc as openapi;

use handlers::{auth, files, health, me, users};

/// Builds the application router. Tests drive this directly with an
/// in-memory store, the server wires it with PostgreSQL.
#[must_use]
pub fn app(
    state: Arc<auth::AuthState>,
    metrics: PrometheusHandle,
    cors: Option<CorsLayer>,
) -> Router {
    let credential_routes = Router::new()
        .route("/login", post(auth::login::login))
        .route("/register", post(auth::register::register))
        .route_layer(middleware::from_fn(auth::throttle));

    let identity_routes = Router::new()
        .route("/me", get(me::me))
        .route("/files", get(files::download))
        .route_layer(middleware::from_fn(auth::authenticate));

    let admin_routes = Router::new().route("/users", post(users::create_user)).route_layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(auth::authenticate))
            .layer(middleware::from_fn(|request: Request<Body>, next: Next| {
                auth::authorize(auth::ADMIN_ONLY, request, next)
            })),
    );

    let app = Router::new()
        .merge(credential_routes)
        .merge(identity_routes)
        .merge(admin_routes)
        .route("/health", get(health::health))
        .route("/metrics", get(move || async move { metrics.render() }))
        .merge(SwaggerUi::new("/docs").url("/docs/openapi.json", openapi::doc()))
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        );

    match cors {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    state: Arc<auth::AuthState>,
    metrics: PrometheusHandle,
    cors_origins: &[String],
) -> Result<()> {
    let cors = cors_layer(cors_origins)?;

    let app = app(state, metrics, cors);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Gracefully shutdown");
    })
    .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

/// CORS layer for the configured origins. With no origins configured the
/// layer is omitted entirely and browsers stay same-origin.
fn cors_layer(origins: &[String]) -> Result<Option<CorsLayer>> {
    if origins.is_empty() {
        return Ok(None);
    }

    let mut allowed = Vec::with_capacity(origins.len());
    for origin in origins {
        allowed.push(exact_origin(origin)?);
    }

    Ok(Some(
        CorsLayer::new()
            .allow_headers([CONTENT_TYPE, AUTHORIZATION])
            .allow_methods([Method::GET, Method::POST])
            .allow_origin(AllowOrigin::list(allowed))
            .allow_credentials(true),
    ))
}

/// Normalizes a configured origin to `scheme://host[:port]`, dropping any
/// path so header comparison is exact.
fn exact_origin(configured: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(configured).with_context(|| format!("Invalid CORS origin: {configured}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("CORS origin must include a valid host: {configured}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);

    HeaderValue::from_str(&origin).context("Failed to build origin header")
}
