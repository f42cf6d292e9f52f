//! HTTP surface: axum router, middleware layers and server lifecycle.

use crate::{
    auth::{Argon2Credentials, AuthServices, PgUserDirectory},
    cli::globals::GatewayConfig,
    rpc::{ContextBuilder, ErrorNormalizer, Router},
    session::{PgSessionStore, SessionManager},
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Method, Request, header::CONTENT_TYPE},
    routing::get,
};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use url::Url;

pub mod handlers;

/// Everything a request needs: the procedure router and the context builder.
pub struct ApiState {
    router: Router,
    contexts: ContextBuilder,
}

impl ApiState {
    #[must_use]
    pub fn new(router: Router, contexts: ContextBuilder) -> Self {
        Self { router, contexts }
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn contexts(&self) -> &ContextBuilder {
        &self.contexts
    }
}

/// Build the axum application around `state`.
///
/// `cors_origin` enables credentialed CORS for exactly that origin.
#[must_use]
pub fn app(state: Arc<ApiState>, cors_origin: Option<HeaderValue>) -> axum::Router {
    let router = axum::Router::new()
        .route(
            "/rpc/:path",
            get(handlers::rpc::query).post(handlers::rpc::mutation),
        )
        .route("/health", get(handlers::health::health));

    let router = match cors_origin {
        Some(origin) => router.layer(
            CorsLayer::new()
                .allow_headers([CONTENT_TYPE])
                .allow_methods([Method::GET, Method::POST])
                .allow_origin(AllowOrigin::exact(origin))
                .allow_credentials(true),
        ),
        None => router,
    };

    router.layer(
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
    )
}

/// Start the server
/// # Errors
/// Return error if the database is unreachable or the listener fails
pub async fn new(config: &GatewayConfig) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(config.dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    let sessions = Arc::new(SessionManager::new(
        Arc::new(PgSessionStore::new(pool.clone())),
        config.session.clone(),
    ));
    let services = AuthServices::new(
        sessions.clone(),
        Arc::new(PgUserDirectory::new(pool.clone())),
        Arc::new(Argon2Credentials),
    );
    let router = services.register(Router::new(ErrorNormalizer::new(config.production)));
    let state = Arc::new(ApiState::new(router, ContextBuilder::new(sessions)));

    let cors_origin = config
        .cors_origin
        .as_deref()
        .map(exact_origin)
        .transpose()?;

    let listener = TcpListener::bind(format!("::0:{}", config.port)).await?;

    info!("Listening on [::]:{}", config.port);

    let served = serve(listener, app(state, cors_origin), shutdown_signal()).await;

    pool.close().await;
    info!("Database pool closed");

    served
}

/// Serve `app` on `listener` until `shutdown` resolves.
///
/// # Errors
/// Returns an error if the server stops abnormally.
pub async fn serve<F>(listener: TcpListener, app: axum::Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Gracefully shutdown");
        })
        .await?;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
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

/// Reduce a configured origin URL to `scheme://host[:port]`.
fn exact_origin(origin: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(origin).with_context(|| format!("Invalid CORS origin: {origin}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("CORS origin must include a valid host: {origin}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build CORS origin header")
}
