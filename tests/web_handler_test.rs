#![cfg(feature = "web")]
//! Web handler integration tests.
//!
//! Tests cover:
//! - Summary renders totals and positions
//! - HTMX fragment vs full page responses
//! - Transaction submission persists and redirects
//! - Invalid submissions are rejected without touching the ledger
//! - Transactions and composition listings
//! - Unknown routes render the error page

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use folio::adapters::csv_adapter::WriteMode;
use folio::adapters::web::{AppState, build_router};
use folio::domain::store::TransactionStore;
use http_body_util::BodyExt;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use common::*;

struct TestApp {
    _dir: TempDir,
    path: PathBuf,
    store: Arc<TransactionStore>,
    prices: Arc<MockPricePort>,
}

impl TestApp {
    fn new(prices: MockPricePort) -> Self {
        let (dir, path) = temp_ledger_path();
        let store = Arc::new(open_store(&path, WriteMode::Append));
        Self {
            _dir: dir,
            path,
            store,
            prices: Arc::new(prices),
        }
    }

    fn router(&self) -> Router {
        build_router(AppState {
            store: self.store.clone(),
            prices: self.prices.clone(),
        })
    }

    fn ledger_contents(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap_or_default()
    }
}

async fn body_text(response: axum::response::Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&body).into_owned()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/add_transaction")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

mod summary_tests {
    use super::*;

    #[tokio::test]
    async fn empty_portfolio_renders_with_ok_status() {
        let app = TestApp::new(MockPricePort::new());

        let response = app.router().oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("No positions yet."));
        assert!(html.contains("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn summary_shows_total_and_position_figures() {
        let app = TestApp::new(MockPricePort::new().with_price("AAPL", 155.0));
        app.store.append_record(deposit(1000.0)).unwrap();
        app.store.append_record(buy("AAPL", 10.0, 150.0)).unwrap();

        let response = app.router().oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<strong>2550</strong>"));
        assert!(html.contains("<td>AAPL</td>"));
        assert!(html.contains("<td>50</td>"));
        assert!(html.contains("3.333%"));
    }

    #[tokio::test]
    async fn htmx_request_gets_fragment_only() {
        let app = TestApp::new(MockPricePort::new());

        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("HX-Request", "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("<div id=\"content\">"));
        assert!(!html.contains("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn unavailable_price_is_reported_not_fatal() {
        let app = TestApp::new(
            MockPricePort::new()
                .with_price("AAPL", 155.0)
                .with_error("ZZZZ", "unknown symbol"),
        );
        app.store.append_record(buy("AAPL", 10.0, 150.0)).unwrap();
        app.store.append_record(buy("ZZZZ", 1.0, 10.0)).unwrap();

        let response = app.router().oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Prices unavailable"));
        assert!(html.contains("ZZZZ"));
        assert!(html.contains("<strong>1550</strong>"));
    }

    #[tokio::test]
    async fn summary_fetches_each_symbol_once() {
        let app = TestApp::new(MockPricePort::new().with_price("AAPL", 155.0));
        app.store.append_record(buy("AAPL", 10.0, 150.0)).unwrap();
        app.store.append_record(buy("AAPL", 5.0, 160.0)).unwrap();

        let response = app.router().oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.prices.call_count(), 1);
    }
}

mod add_transaction_tests {
    use super::*;

    #[tokio::test]
    async fn valid_buy_is_persisted_and_redirects() {
        let app = TestApp::new(MockPricePort::new());

        let response = app
            .router()
            .oneshot(post_form(
                "date=2024-01-02&type=buy&symbol=aapl&quantity=10&price=150&cash=",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        assert_eq!(app.store.len().unwrap(), 1);

        let contents = app.ledger_contents();
        assert!(contents.starts_with("Date,Type,Symbol,Quantity,Price,Cash"));
        assert!(contents.contains("AAPL"));
    }

    #[tokio::test]
    async fn valid_deposit_is_persisted() {
        let app = TestApp::new(MockPricePort::new());

        let response = app
            .router()
            .oneshot(post_form("date=2024-01-01&type=deposit&cash=500"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let log = app.store.snapshot().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind().as_str(), "deposit");
    }

    #[tokio::test]
    async fn negative_deposit_is_rejected_without_writing() {
        let app = TestApp::new(MockPricePort::new());

        let response = app
            .router()
            .oneshot(post_form("date=2024-01-01&type=deposit&cash=-5"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_text(response).await;
        assert!(html.contains("cash"));
        assert!(app.store.is_empty().unwrap());
        assert_eq!(app.ledger_contents(), "");
    }

    #[tokio::test]
    async fn buy_without_price_is_rejected() {
        let app = TestApp::new(MockPricePort::new());

        let response = app
            .router()
            .oneshot(post_form("date=2024-01-02&type=buy&symbol=AAPL&quantity=10"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(app.store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn unknown_type_is_rejected() {
        let app = TestApp::new(MockPricePort::new());

        let response = app
            .router()
            .oneshot(post_form("date=2024-01-02&type=sell&symbol=AAPL"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

mod listing_tests {
    use super::*;

    #[tokio::test]
    async fn transactions_lists_every_record_in_order() {
        let app = TestApp::new(MockPricePort::new());
        app.store.append_record(deposit(1000.0)).unwrap();
        app.store.append_record(buy("MSFT", 2.0, 300.0)).unwrap();

        let response = app.router().oneshot(get("/transactions")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        let deposit_at = html.find("<td>deposit</td>").unwrap();
        let buy_at = html.find("<td>buy</td>").unwrap();
        assert!(deposit_at < buy_at);
        assert!(html.contains("<td>MSFT</td>"));
    }

    #[tokio::test]
    async fn composition_uses_mean_entry_price() {
        let app = TestApp::new(MockPricePort::new());
        app.store.append_record(buy("AAPL", 10.0, 100.0)).unwrap();
        app.store.append_record(buy("AAPL", 30.0, 200.0)).unwrap();

        let response = app
            .router()
            .oneshot(get("/portfolio_composition"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<td>40</td>"));
        assert!(html.contains("<td>150</td>"));
        assert!(html.contains("<td>6000</td>"));
        // No price lookups for composition.
        assert_eq!(app.prices.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_route_returns_not_found_page() {
        let app = TestApp::new(MockPricePort::new());

        let response = app.router().oneshot(get("/nope")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let html = body_text(response).await;
        assert!(html.contains("Page not found"));
    }
}
