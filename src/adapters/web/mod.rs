//! Web server adapter.
//!
//! Axum server with an HTMX-enhanced HTML frontend for viewing the portfolio
//! and recording transactions.

mod error;
mod handlers;
mod templates;

pub use error::WebError;
pub use handlers::*;
pub use templates::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::domain::store::TransactionStore;
use crate::ports::price_port::PricePort;

pub struct AppState {
    pub store: Arc<TransactionStore>,
    pub prices: Arc<dyn PricePort + Send + Sync>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::summary))
        .route("/transactions", get(handlers::transactions))
        .route("/portfolio_composition", get(handlers::portfolio_composition))
        .route("/add_transaction", post(handlers::add_transaction))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

fn is_htmx_request(headers: &axum::http::HeaderMap) -> bool {
    headers.get("HX-Request").is_some()
}
