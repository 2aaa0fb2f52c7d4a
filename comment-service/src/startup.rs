use crate::config::{CommentConfig, StoreBackend};
use crate::handlers::{self, comments, resource::ResourceState, users};
use crate::models::{Comment, Resource, User};
use crate::services::{DocumentStore, InMemoryStore, MongoDb};
use axum::{middleware::from_fn, routing::get, Router};
use secrecy::ExposeSecret;
use service_core::error::{AppError, ErrorResponse, FieldViolation};
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, RequestSpan,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::health::metrics_endpoint,
        comments::list_comments,
        comments::create_comment,
        comments::get_comment,
        comments::replace_comment,
        comments::update_comment,
        comments::delete_comment,
        users::list_users,
        users::create_user,
        users::get_user,
        users::replace_user,
        users::update_user,
        users::delete_user,
    ),
    components(
        schemas(Comment, User, ErrorResponse, FieldViolation)
    ),
    tags(
        (name = "Comments", description = "Comment documents"),
        (name = "Users", description = "User documents"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: CommentConfig,
    pub store: Arc<dyn DocumentStore>,
}

/// Opens the configured store backend.
pub async fn connect_store(config: &CommentConfig) -> Result<Arc<dyn DocumentStore>, AppError> {
    match config.store.backend {
        StoreBackend::MongoDb => {
            let db =
                MongoDb::connect(config.mongodb.uri.expose_secret(), &config.mongodb.database)
                    .await?;
            Ok(Arc::new(db))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; documents are lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

fn resource_state<R: Resource>(state: &AppState) -> ResourceState {
    ResourceState::new::<R>(
        state.store.collection(R::COLLECTION),
        state.config.public_url.clone(),
    )
}

pub fn build_router(state: AppState) -> Router {
    let comment_routes = comments::router(resource_state::<Comment>(&state));
    let user_routes = users::router(resource_state::<User>(&state));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .with_state(state)
        .nest(&Comment::mount_path(), comment_routes)
        .nest(&User::mount_path(), user_routes)
        .merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
        // Outermost, so the span above already sees the request id.
        .layer(from_fn(request_id_middleware))
}

type ServerFuture = Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>;

pub struct Application {
    port: u16,
    server: ServerFuture,
    state: AppState,
}

impl Application {
    pub async fn build(config: CommentConfig) -> Result<Self, AppError> {
        let store = connect_store(&config).await?;
        Self::with_store(config, store).await
    }

    /// Binds the listener around an already opened store.
    pub async fn with_store(
        config: CommentConfig,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, AppError> {
        let state = AppState {
            config: config.clone(),
            store,
        };
        let app = build_router(state.clone());

        let addr = config.common.bind_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port = port,
            store = config.store.backend.as_str(),
            "Listening"
        );

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::pin(async move { server.await }),
            state,
        })
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.state.store.clone()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
