use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod auth;
mod error;
mod orders;
mod products;
mod stats;
mod types;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

impl AppState {
    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<crate::services::AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn order_service(&self) -> &Arc<crate::services::OrderService> {
        &self.shared.order_service
    }

    #[must_use]
    pub fn image_service(&self) -> &Arc<crate::services::ImageService> {
        &self.shared.image_service
    }
}

pub async fn router(shared: Arc<SharedState>) -> Router {
    let (images_path, cors_origins) = {
        let config = shared.config.read().await;
        (
            config.general.images_path.clone(),
            config.server.cors_allowed_origins.clone(),
        )
    };

    let state = Arc::new(AppState { shared });

    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/products", get(products::list_products))
        .route("/products/{id}", get(products::get_product))
        .route("/orders", post(orders::create_order));

    let user_routes = Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/auth/logout", post(auth::logout))
        .route("/orders/mine", get(orders::my_orders))
        .route("/orders/mine/{code}", get(orders::my_order_by_code))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/products", post(products::create_product))
        .route("/products/{id}", put(products::update_product))
        .route("/products/{id}", delete(products::delete_product))
        .route("/orders", get(orders::list_orders))
        .route("/orders/{code}", get(orders::get_order))
        .route("/orders/{code}/collected", patch(orders::mark_collected))
        .route("/stats", get(stats::get_stats))
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .nest_service("/images", tower_http::services::ServeDir::new(images_path))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
