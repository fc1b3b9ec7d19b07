use std::net::SocketAddr;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{delete, get},
};
use stockpile_core::{Product, Task};
use stockpile_storage::DynDocumentStore;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    bootstrap,
    cache::DynCacheStore,
    config::{AppConfig, StorageBackend},
    handlers,
    middleware as app_middleware,
    repository::{CacheAdmin, CachedRepository},
};

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub products: CachedRepository<Product>,
    pub tasks: CachedRepository<Task>,
    pub cache_admin: CacheAdmin,
    pub store: DynDocumentStore,
    pub cache: DynCacheStore,
}

impl AppState {
    pub fn new(store: DynDocumentStore, cache: DynCacheStore, cfg: &AppConfig) -> Self {
        let ttl = cfg.cache_ttl();
        Self {
            products: CachedRepository::new(store.clone(), cache.clone(), ttl),
            tasks: CachedRepository::new(store.clone(), cache.clone(), ttl),
            cache_admin: CacheAdmin::new(cache.clone()),
            store,
            cache,
        }
    }
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    crate::metrics::init_metrics();
    let body_limit = cfg.server.body_limit_bytes;

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/products",
            get(handlers::list::<Product>).post(handlers::create::<Product>),
        )
        .route(
            "/products/{id}",
            get(handlers::read::<Product>)
                .put(handlers::update::<Product>)
                .delete(handlers::delete::<Product>),
        )
        .route(
            "/tasks",
            get(handlers::list::<Task>).post(handlers::create::<Task>),
        )
        .route(
            "/tasks/{id}",
            get(handlers::read::<Task>)
                .put(handlers::update::<Task>)
                .delete(handlers::delete::<Task>),
        )
        .route("/cache/stats", get(handlers::cache_stats))
        .route("/cache/clear", delete(handlers::cache_clear))
        // Only matched routes negotiate content type; unknown paths fall through to 404
        .route_layer(middleware::from_fn(app_middleware::json_content_type))
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .fallback(handlers::not_found)
        .with_state(state)
        // Layers run bottom-up: body limit, timeout, cors, request id, trace, metrics
        .layer(middleware::from_fn(app_middleware::http_metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            cfg.request_timeout(),
        ))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Connects both stores, seeds sample data if configured, and wires the router.
    pub async fn build(self) -> anyhow::Result<StockpileServer> {
        let store = create_document_store(&self.config).await?;
        let cache = crate::create_cache_store(&self.config.redis).await;
        let state = AppState::new(store, cache, &self.config);

        if self.config.bootstrap.seed_sample_data {
            let stats = bootstrap::seed_sample_data(&state).await?;
            tracing::info!(
                products = stats.products,
                tasks = stats.tasks,
                "sample data bootstrap finished"
            );
        }

        let app = build_app(state, &self.config);
        Ok(StockpileServer {
            addr: self.addr,
            app,
        })
    }
}

/// Opens the configured document store.
pub async fn create_document_store(cfg: &AppConfig) -> anyhow::Result<DynDocumentStore> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory document store");
            Ok(stockpile_db_memory::create_memory_store())
        }
        StorageBackend::Postgres => {
            let pg = cfg.storage.postgres.clone().unwrap_or_default();
            let store: DynDocumentStore =
                stockpile_db_postgres::create_postgres_store(pg.to_postgres_config())
                    .await
                    .map_err(|e| anyhow::anyhow!("postgres store initialization failed: {e}"))?;
            tracing::info!("✓ Connected to PostgreSQL");
            Ok(store)
        }
    }
}

pub struct StockpileServer {
    addr: SocketAddr,
    app: Router,
}

impl StockpileServer {
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
