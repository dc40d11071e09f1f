//! HTTP storefront and admin console.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Health check
//!
//! # Storefront
//! GET    /api/ties?lang=                  - Active catalog
//! GET    /api/ties/{id}                   - One active tie
//! POST   /api/orders                      - Web checkout
//! GET    /api/users/{telegram_id}/orders  - A buyer's orders
//! POST   /api/auth/telegram               - Is this Telegram id an admin?
//!
//! # Admin (Bearer password or X-Telegram-Id of an admin)
//! GET    /admin/orders                    - All orders, newest first
//! POST   /admin/orders/{id}/approve       - Approve payment
//! POST   /admin/orders/{id}/reject        - Reject payment
//! POST   /admin/orders/{id}/delivery      - Set delivery days and dispatch
//! POST   /admin/orders/{id}/delivered     - Mark delivered
//! GET    /admin/ties                      - Full catalog incl. hidden
//! POST   /admin/ties                      - Create tie
//! PUT    /admin/ties/{id}                 - Sparse update
//! DELETE /admin/ties/{id}                 - Soft delete
//! POST   /admin/ties/{id}/toggle          - Flip visibility
//! POST   /admin/broadcast                 - Message all users or one
//! GET    /admin/report                    - Plain-text sales report
//!
//! GET    /images/*                        - Tie photos
//! ```

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::notify::Messenger;

pub mod admin;
pub mod auth;
pub mod error;
pub mod state;
pub mod storefront;

pub use error::AppError;
pub use state::WebState;

/// Build the application router
pub fn app<M>(state: WebState<M>) -> Router
where
    M: Messenger + 'static,
{
    let images = ServeDir::new(state.ctx.images_dir.clone());

    Router::new()
        .route("/health", get(storefront::health::<M>))
        .route("/api/ties", get(storefront::list_ties::<M>))
        .route("/api/ties/{id}", get(storefront::get_tie::<M>))
        .route("/api/orders", post(storefront::create_order::<M>))
        .route(
            "/api/users/{telegram_id}/orders",
            get(storefront::user_orders::<M>),
        )
        .route("/api/auth/telegram", post(storefront::auth_telegram::<M>))
        .route("/admin/orders", get(admin::list_orders::<M>))
        .route("/admin/orders/{id}/approve", post(admin::approve_order::<M>))
        .route("/admin/orders/{id}/reject", post(admin::reject_order::<M>))
        .route("/admin/orders/{id}/delivery", post(admin::set_delivery::<M>))
        .route(
            "/admin/orders/{id}/delivered",
            post(admin::mark_delivered::<M>),
        )
        .route(
            "/admin/ties",
            get(admin::list_ties::<M>).post(admin::create_tie::<M>),
        )
        .route(
            "/admin/ties/{id}",
            put(admin::update_tie::<M>).delete(admin::delete_tie::<M>),
        )
        .route("/admin/ties/{id}/toggle", post(admin::toggle_tie::<M>))
        .route("/admin/broadcast", post(admin::broadcast::<M>))
        .route("/admin/report", get(admin::report::<M>))
        .nest_service("/images", images)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process exits
pub async fn serve<M>(state: WebState<M>, addr: std::net::SocketAddr) -> std::io::Result<()>
where
    M: Messenger + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Web server listening");
    axum::serve(listener, app(state)).await
}
