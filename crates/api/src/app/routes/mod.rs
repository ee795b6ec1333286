use axum::Router;

pub mod accounting;
pub mod common;
pub mod inventory;
pub mod outbox;
pub mod purchases;
pub mod sales;
pub mod system;

/// Router for all domain endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/purchases", purchases::router())
        .nest("/sales", sales::router())
        .nest("/inventory", inventory::router())
        .nest("/accounting", accounting::router())
        .nest("/outbox", outbox::router())
}
