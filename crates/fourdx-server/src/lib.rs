pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(root: PathBuf) -> anyhow::Result<Router> {
    let app_state = state::AppState::open(root)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Calendar
        .route("/api/weeks/current", get(routes::weeks::current_week))
        .route("/api/weeks/{week}", get(routes::weeks::get_week))
        // Config
        .route(
            "/api/config",
            get(routes::config::get_config).put(routes::config::put_config),
        )
        .route("/api/templates", get(routes::config::list_templates))
        // Members
        .route(
            "/api/members",
            get(routes::members::list_members).post(routes::members::create_member),
        )
        .route(
            "/api/members/{id}",
            get(routes::members::get_member)
                .patch(routes::members::update_member)
                .delete(routes::members::remove_member),
        )
        .route(
            "/api/members/{id}/rollover",
            post(routes::members::rollover_member),
        )
        // Commitments
        .route(
            "/api/commitments",
            get(routes::commitments::list_commitments)
                .post(routes::commitments::create_commitment),
        )
        .route(
            "/api/commitments/{id}",
            axum::routing::patch(routes::commitments::update_commitment)
                .delete(routes::commitments::delete_commitment),
        )
        .route(
            "/api/commitments/{id}/cycle",
            post(routes::commitments::cycle_commitment),
        )
        // Dashboard
        .route("/api/dashboard/{week}", get(routes::dashboard::get_dashboard))
        // WIG sessions
        .route(
            "/api/sessions/{week}",
            get(routes::sessions::get_session).delete(routes::sessions::reset_session),
        )
        .route(
            "/api/sessions/{week}/schedule",
            post(routes::sessions::schedule_session),
        )
        .route(
            "/api/sessions/{week}/start",
            post(routes::sessions::start_session),
        )
        .route(
            "/api/sessions/{week}/advance",
            post(routes::sessions::advance_session),
        )
        .route(
            "/api/sessions/{week}/notes",
            axum::routing::put(routes::sessions::put_notes),
        )
        .route(
            "/api/sessions/{week}/obstacles",
            axum::routing::put(routes::sessions::put_obstacles),
        )
        .route(
            "/api/sessions/{week}/steps/{n}",
            get(routes::sessions::get_step),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);
    Ok(router)
}

/// Start the fourdx API server.
pub async fn serve(root: PathBuf, port: u16, open_browser: bool) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, listener, open_browser).await
}

/// Start the fourdx API server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(
    root: PathBuf,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(root)?;

    tracing::info!("fourdx server listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}/api/dashboard/current");
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;
    Ok(())
}
