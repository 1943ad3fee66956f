//! Main HTTP gateway server: shared state, router, and listener.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, instrument, warn};

use docgate_config::DocgateConfig;
use docgate_core::ObjectStore;
use docgate_storage::open_store;
use docgate_understanding::{AutoRagClient, ExtractOrchestrator, FanoutOptions, MistralOcrClient};

use crate::{autorag, extract, health_api, home, objects, ocr};

/// Largest request body accepted on upload routes.
pub const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Application state shared across routes. Providers are `None` when their
/// config section is absent or incomplete.
#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<dyn ObjectStore>,
    pub ocr: Option<Arc<MistralOcrClient>>,
    pub extractor: Option<Arc<ExtractOrchestrator>>,
    pub search: Option<Arc<AutoRagClient>>,
    /// Prefix under which stored objects are publicly reachable.
    pub public_base_url: Option<String>,
    pub fanout: FanoutOptions,
    pub stream_buffer: usize,
}

impl GatewayState {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            ocr: None,
            extractor: None,
            search: None,
            public_base_url: None,
            fanout: FanoutOptions::default(),
            stream_buffer: docgate_config::defaults::DEFAULT_STREAM_BUFFER,
        }
    }

    pub fn with_ocr(mut self, client: MistralOcrClient) -> Self {
        self.ocr = Some(Arc::new(client));
        self
    }

    pub fn with_extractor(mut self, orchestrator: ExtractOrchestrator) -> Self {
        self.extractor = Some(Arc::new(orchestrator));
        self
    }

    pub fn with_search(mut self, client: AutoRagClient) -> Self {
        self.search = Some(Arc::new(client));
        self
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }

    pub fn with_fanout(mut self, fanout: FanoutOptions) -> Self {
        self.fanout = fanout;
        self
    }

    pub fn with_stream_buffer(mut self, size: usize) -> Self {
        self.stream_buffer = size.max(1);
        self
    }

    /// Open the store and build every configured provider client.
    pub async fn from_config(config: &DocgateConfig) -> Result<Self> {
        let store = open_store(&config.storage)
            .await
            .context("Failed to open object store")?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("docgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let mut state = GatewayState::new(store.clone()).with_stream_buffer(config.server.stream_buffer);
        if let Some(url) = &config.storage.public_base_url {
            state = state.with_public_base_url(url.clone());
        }

        match config.ocr.as_ref().filter(|c| c.is_configured()) {
            Some(ocr) => {
                state = state
                    .with_ocr(MistralOcrClient::from_config(ocr, http.clone())?)
                    .with_fanout(FanoutOptions {
                        store_page_json: ocr.store_page_json,
                    });
                info!(model = %ocr.model, "OCR provider enabled");
            }
            None => debug!("OCR provider not configured; /ocr will return 500"),
        }

        match config.extract.as_ref().filter(|c| c.is_configured()) {
            Some(extract) => {
                state = state.with_extractor(ExtractOrchestrator::from_config(extract, http.clone(), store)?);
                info!(poll_attempts = extract.poll_attempts, "Extract provider enabled");
            }
            None => debug!("Extract provider not configured; /adobe-extract will return 500"),
        }

        match config.search.as_ref().filter(|c| c.is_configured()) {
            Some(search) => {
                state = state.with_search(AutoRagClient::from_config(search, http)?);
                info!("Search provider enabled");
            }
            None => debug!("Search provider not configured; /autorag will return 500"),
        }

        Ok(state)
    }
}

/// Build the router with every route and the shared middleware.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/api/health", get(health_api::get_health))
        .route("/upload/*key", post(objects::upload))
        .route("/download/*key", get(objects::download))
        .route("/ocr", post(ocr::ocr_body))
        .route("/ocr/*key", post(ocr::ocr_stored))
        .route("/autorag", post(autorag::query))
        .route("/adobe-extract/*key", post(extract::adobe_extract))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
