//! services/api/src/bin/api.rs

use api_lib::{
    adapters::db::DbAdapter,
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, register_handler},
        chat::{
            create_thread_handler, get_thread_handler, list_threads_handler,
            post_message_handler,
        },
        help::{
            list_requests_handler, reply_handler, request_detail_handler, set_status_handler,
            stats_handler,
        },
        list_programs_handler, require_auth, require_staff, require_student,
        student::{
            create_request_handler, my_requests_handler, post_chat_message_handler,
            request_chat_handler,
        },
        ApiDoc, AppState, TokenCodec,
    },
};
use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use dtai_core::assistant::Assistant;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout)
        .connect(&config.database_url)
        .await
        .map_err(ApiError::Database)?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter
        .run_migrations()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!("Database migrations complete.");

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        directory: db_adapter.clone(),
        chat: db_adapter.clone(),
        help_desk: db_adapter.clone(),
        assistant: Assistant::new(db_adapter),
        tokens: TokenCodec::new(config.jwt_secret.clone()),
        config: config.clone(),
    });

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/login", post(login_handler))
        .route("/api/register", post(register_handler))
        .route("/api/programs", get(list_programs_handler));

    // Routes for any authenticated principal
    let authed_routes = Router::new()
        .route("/api/logout", post(logout_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Staff-only routes: the auth gate runs first, then the staff profile check.
    let staff_routes = Router::new()
        .route(
            "/api/chatbot/threads",
            post(create_thread_handler).get(list_threads_handler),
        )
        .route("/api/chatbot/threads/{id}", get(get_thread_handler))
        .route("/api/chatbot/messages", post(post_message_handler))
        .route("/api/help-requests", get(list_requests_handler))
        .route("/api/help-requests/stats", get(stats_handler))
        .route("/api/help-requests/{id}", get(request_detail_handler))
        .route("/api/help-requests/{id}/reply", post(reply_handler))
        .route("/api/help-requests/{id}/status", patch(set_status_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_staff,
        ))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Student-only routes: auth gate plus active-enrollment check.
    let student_routes = Router::new()
        .route(
            "/api/student/help-requests",
            get(my_requests_handler).post(create_request_handler),
        )
        .route(
            "/api/student/help-requests/{id}/chat",
            get(request_chat_handler).post(post_chat_message_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_student,
        ))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(authed_routes)
        .merge(staff_routes)
        .merge(student_routes)
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
