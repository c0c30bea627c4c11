use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Json, Router, routing::get};
use mykb_auth::middleware::BearerState;
use mykb_auth::storage::{ClientStorage, TokenStore};
use mykb_auth::{OAuthState, ProxyMode, oauth_router};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;

pub struct MykbServer {
    addr: SocketAddr,
    app: Router,
}

/// Assembles the HTTP application: OAuth endpoints, the optional protected
/// resource router and `/health`, under the shared middleware stack.
pub fn build_app(cfg: &AppConfig, oauth: OAuthState, resource: Option<Router<BearerState>>) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    let bearer = oauth.bearer_state();

    let mut app = Router::new()
        .route("/health", get(health))
        .merge(oauth_router(oauth));
    if let Some(resource) = resource {
        app = app.merge(resource.with_state(bearer));
    }

    app
        // Middleware stack (order: cors/trace -> body limit)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
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
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    client_storage: Option<Arc<dyn ClientStorage>>,
    token_store: Option<Arc<dyn TokenStore>>,
    resource: Option<Router<BearerState>>,
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
            client_storage: None,
            token_store: None,
            resource: None,
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

    /// Use this client registry backend instead of the configured one.
    pub fn with_client_storage(mut self, storage: Arc<dyn ClientStorage>) -> Self {
        self.client_storage = Some(storage);
        self
    }

    /// Use this token store instead of the configured one.
    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    /// Mount a protected resource. Handlers authenticate callers with the
    /// [`BearerToken`](mykb_auth::BearerToken) extractor.
    pub fn with_resource_router(mut self, router: Router<BearerState>) -> Self {
        self.resource = Some(router);
        self
    }

    pub async fn build(self) -> anyhow::Result<MykbServer> {
        let client_storage = match self.client_storage {
            Some(storage) => storage,
            None => crate::create_client_storage(&self.config.storage).await?,
        };
        let token_store = match self.token_store {
            Some(store) => store,
            None => crate::create_token_store(&self.config.redis).await,
        };

        let oauth = OAuthState::new(
            &self.config.auth,
            &self.config.base_url(),
            client_storage,
            token_store,
            ProxyMode::from_flag(self.config.server.behind_proxy),
        )?;
        let app = build_app(&self.config, oauth, self.resource);

        Ok(MykbServer {
            addr: self.addr,
            app,
        })
    }
}

impl MykbServer {
    /// The assembled application, for serving on a caller-owned listener.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        serve(listener, self.app, shutdown_signal()).await
    }
}

/// Serve `app` until `shutdown` resolves. Handlers see the peer address
/// through `ConnectInfo<SocketAddr>`.
pub async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
