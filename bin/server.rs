// Grocery Organizer - Web Server
// REST API with Axum

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use grocery_organizer::{
    short_name, validate_postal_code, Category, Config, Database, Error, ItemGroup, Organizer,
    StoreDetails, StoreLayout, StoreRef,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    organizer: Arc<Organizer>,
    db: Arc<Database>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

/// Error carried back to the client with its HTTP status
struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_server_error() {
            log::error!("request failed: {}", self.1);
        } else {
            log::warn!("request rejected: {}", self.1);
        }
        (self.0, Json(ApiResponse::err(self.1))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::StoreNotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidStore(_) | Error::UnknownCategory(_) => StatusCode::BAD_REQUEST,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err))
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// Request / Response bodies
// ============================================================================

#[derive(Deserialize)]
struct OrganizeRequest {
    items: Vec<String>,
    #[serde(default)]
    store_id: Option<i64>,
    #[serde(default)]
    store_name: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
}

#[derive(Serialize)]
struct OrganizeResponse {
    content: Vec<ItemGroup>,
}

#[derive(Deserialize)]
struct StoreQuery {
    name: Option<String>,
    zip: Option<String>,
}

#[derive(Deserialize)]
struct LayoutQuery {
    zip: Option<String>,
}

#[derive(Serialize)]
struct LayoutResponse {
    store: StoreDetails,
    zones: StoreLayout,
}

#[derive(Deserialize)]
struct OverrideRequest {
    item: String,
    category: String,
    #[serde(default)]
    normalized_name: Option<String>,
}

#[derive(Serialize)]
struct OverrideResponse {
    item: String,
    category: Category,
    normalized_name: String,
}

/// Blank strings count as absent; a present ZIP must be 5 digits
fn clean_postal_code(postal_code: Option<String>) -> Result<Option<String>, Error> {
    match postal_code.map(|code| code.trim().to_string()) {
        Some(code) if code.is_empty() => Ok(None),
        Some(code) => {
            validate_postal_code(&code)?;
            Ok(Some(code))
        }
        None => Ok(None),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/organize - Classify and order a shopping list
async fn organize(
    State(state): State<AppState>,
    Json(request): Json<OrganizeRequest>,
) -> ApiResult<OrganizeResponse> {
    let postal_code = clean_postal_code(request.postal_code)?;
    let store_name = request
        .store_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let store = match (request.store_id, store_name) {
        (Some(id), _) => Some(StoreRef::Id(id)),
        (None, Some(name)) => Some(StoreRef::Name { name, postal_code }),
        (None, None) => None,
    };

    log::info!("organizing {} items (store: {:?})", request.items.len(), store);

    // Classification may block on SQLite and remote calls
    let organizer = state.organizer.clone();
    let items = request.items;
    let content = tokio::task::spawn_blocking(move || organizer.organize(store.as_ref(), &items))
        .await
        .context("organize task failed")??;

    Ok(Json(OrganizeResponse { content }))
}

/// GET /api/stores - List stores, or resolve one by name (+ zip)
async fn get_stores(
    State(state): State<AppState>,
    Query(query): Query<StoreQuery>,
) -> ApiResult<ApiResponse<Vec<StoreDetails>>> {
    let postal_code = clean_postal_code(query.zip)?;

    let stores = match query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            let organizer = state.organizer.clone();
            let name = name.to_string();
            let details = tokio::task::spawn_blocking(move || {
                organizer.layouts().resolve(&name, postal_code.as_deref())
            })
            .await
            .context("store lookup task failed")??;
            vec![details]
        }
        None => {
            let db = state.db.clone();
            tokio::task::spawn_blocking(move || db.list_stores())
                .await
                .context("store listing task failed")??
        }
    };

    Ok(Json(ApiResponse::ok(stores)))
}

/// GET /api/stores/:name/layout - Zones of one store location
async fn get_store_layout(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LayoutQuery>,
) -> ApiResult<ApiResponse<LayoutResponse>> {
    // Decode URL-encoded store name ("Trader%20Joe's")
    let decoded_name = urlencoding::decode(&name)
        .unwrap_or_else(|_| name.clone().into())
        .into_owned();
    let postal_code = clean_postal_code(query.zip)?;

    let organizer = state.organizer.clone();
    let response = tokio::task::spawn_blocking(move || -> Result<LayoutResponse, Error> {
        let layouts = organizer.layouts();
        let store = layouts.resolve(&decoded_name, postal_code.as_deref())?;
        let zones = layouts.layout_of(&store)?;
        Ok(LayoutResponse { store, zones })
    })
    .await
    .context("store layout task failed")??;

    Ok(Json(ApiResponse::ok(response)))
}

/// POST /api/items/override - Pin an item to a category
async fn override_item(
    State(state): State<AppState>,
    Json(request): Json<OverrideRequest>,
) -> ApiResult<ApiResponse<OverrideResponse>> {
    let item = request.item.trim().to_string();
    if item.is_empty() {
        return Err(ApiError(StatusCode::BAD_REQUEST, "item must not be blank".to_string()));
    }
    let category: Category = request.category.parse()?;
    let normalized_name = request
        .normalized_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| short_name(&item));

    let db = state.db.clone();
    let (pinned_item, pinned_name) = (item.clone(), normalized_name.clone());
    tokio::task::spawn_blocking(move || db.override_item(&pinned_item, category, &pinned_name))
        .await
        .context("override task failed")??;
    log::info!("manual override: '{}' -> {}", item, category);

    Ok(Json(ApiResponse::ok(OverrideResponse {
        item,
        category,
        normalized_name,
    })))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter()))
        .init();

    log::info!("🌐 Grocery Organizer - Web Server");

    let db = Arc::new(Database::open(&config.db_path)?);
    log::info!("database opened: {:?}", config.db_path);

    if config.api_key.is_none() {
        log::warn!("no GEMINI_API_KEY set, classification will use keyword heuristics only");
    }

    // Create shared state
    let state = AppState {
        organizer: Arc::new(Organizer::from_config(&config, db.clone())),
        db,
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/organize", post(organize))
        .route("/stores", get(get_stores))
        .route("/stores/:name/layout", get(get_store_layout))
        .route("/items/override", post(override_item))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    // Start server
    let addr = std::env::var("GROCERY_SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    log::info!("🚀 Server running on http://{}", addr);
    log::info!("   API: http://{}/api/organize", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
