// src/lib.rs

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use services::price_query::PriceQueryService;
use services::price_store::PriceStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub prices: PriceQueryService,
}

impl AppState {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            prices: PriceQueryService::new(PriceStore::new(db)),
        }
    }
}

pub mod entities {
    pub mod prelude;
    pub mod price_history;
}

pub mod services {
    pub mod price_feed;
    pub mod price_query;
    pub mod price_reconciler;
    pub mod price_store;
    pub mod series_decoder;
}

pub mod jobs {
    pub mod price_history_sync;
}

pub mod models {
    pub mod price_history;
}

pub mod handlers {
    pub mod price_history;
}

pub mod config;
pub mod error;

/// Builds the HTTP router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::price_history::api_index))
        .route(
            "/price-history",
            get(handlers::price_history::get_price_history)
                .post(handlers::price_history::lookup_price_history),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
