//! HTTP surface: router, shared state and server loop.

pub mod auth;
pub mod error;
pub mod resources;
pub mod users;

pub use auth::AuthUser;
pub use error::{ApiError, ApiJson, ApiResult};

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{
    AUTHORIZATION, CONTENT_TYPE, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY,
    X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthService, GoogleIdentityProvider, TokenIssuer};
use crate::config::Config;
use crate::entity::{Event, Note, Task};
use crate::error::{IonixError, Result};
use crate::service::{self, AnalyticsSummary, ChatModel, ChatRequest, ChatResponse, GeminiClient};
use crate::storage::{self, SharedStore, SqliteStore};

const STATUS_TEXT: &str = "Ionix API is running";

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub auth: AuthService,
    pub chat: Arc<dyn ChatModel>,
}

impl AppState {
    pub fn new(store: SharedStore, auth: AuthService, chat: Arc<dyn ChatModel>) -> Self {
        Self { store, auth, chat }
    }

    /// Open the store and build the production collaborators.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = storage::shared(SqliteStore::open(&config.database)?);
        let tokens = Arc::new(TokenIssuer::new(&config.jwt)?);
        let identity = Arc::new(GoogleIdentityProvider::new(config.google.client_id.clone()));
        let auth = AuthService::new(store.clone(), tokens, identity);
        let chat = Arc::new(GeminiClient::new(config.ai.clone()));
        Ok(Self::new(store, auth, chat))
    }
}

// ============================================================================
// Handlers without a module of their own
// ============================================================================

async fn api_status() -> &'static str {
    STATUS_TEXT
}

async fn analytics(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<AnalyticsSummary>> {
    Ok(Json(service::compute_summary(&state.store, user.id).await?))
}

async fn chat(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiJson(request): ApiJson<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    Ok(Json(service::ai::chat(state.chat.as_ref(), request).await?))
}

// ============================================================================
// Router
// ============================================================================

fn api_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/google", post(users::google))
        .route("/users/me", get(users::me))
        .route("/users/profile", put(users::update_profile))
        .route("/users/premium", put(users::upgrade_premium))
        .route("/analytics", get(analytics))
        .route("/ai/chat", post(chat));

    let router = resources::routes::<Task>(router);
    let router = resources::routes::<Note>(router);
    resources::routes::<Event>(router)
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    match origin {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .map_err(|e| IonixError::Config(format!("invalid cors_origin: {}", e)))?;
            Ok(layer.allow_origin(origin).allow_credentials(true))
        }
        None => Ok(layer),
    }
}

/// Hardening headers added to every response that does not already set them.
const SECURITY_HEADERS: [(HeaderName, &str); 4] = [
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (X_FRAME_OPTIONS, "SAMEORIGIN"),
    (REFERRER_POLICY, "no-referrer"),
    (STRICT_TRANSPORT_SECURITY, "max-age=31536000; includeSubDomains"),
];

fn security_headers(router: Router<AppState>) -> Router<AppState> {
    SECURITY_HEADERS.iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            name.clone(),
            HeaderValue::from_static(*value),
        ))
    })
}

/// Build the full application: API under `/api`, liveness at
/// `/api-status`, and the single-page frontend for every other path.
pub fn router(state: AppState, config: &Config) -> Result<Router> {
    let frontend = ServeDir::new(&config.static_dir)
        .fallback(ServeFile::new(config.static_dir.join("index.html")));

    let app = Router::new()
        .nest("/api", api_routes())
        .route("/api-status", get(api_status))
        .fallback_service(frontend)
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(cors_layer(config.cors_origin.as_deref())?);

    Ok(security_headers(app)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Serve `app` on `listener` until `shutdown` is cancelled.
pub async fn serve(listener: TcpListener, app: Router, shutdown: CancellationToken) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Ionix API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
