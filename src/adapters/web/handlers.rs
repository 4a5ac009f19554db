//! HTTP request handlers for web adapter.

use askama::Template;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use crate::domain::transaction::TransactionDraft;
use crate::domain::valuation::{PortfolioView, composition};

use super::templates::{BasePage, CompositionTemplate, SummaryTemplate, TransactionsTemplate};
use super::{AppState, WebError, is_htmx_request};

/// Renders `fragment` alone for HTMX requests, inside the base layout otherwise.
fn render_page<T: Template>(
    title: &str,
    fragment: &T,
    headers: &HeaderMap,
) -> Result<Response, WebError> {
    let content = fragment
        .render()
        .map_err(|e| WebError::internal(format!("template error: {e}")))?;
    if is_htmx_request(headers) {
        return Ok(Html(content).into_response());
    }
    let page = BasePage {
        title,
        content: &content,
    };
    let html = page
        .render()
        .map_err(|e| WebError::internal(format!("template error: {e}")))?;
    Ok(Html(html).into_response())
}

fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let log = state.store.snapshot()?;
    let prices = state.prices.clone();

    // Price lookups block on the network.
    let view = tokio::task::spawn_blocking(move || PortfolioView::compute(&log, &*prices))
        .await
        .map_err(|e| WebError::internal(format!("valuation task failed: {e}")))?;

    let template = SummaryTemplate::new(&view, today());
    render_page("Summary", &template, &headers)
}

pub async fn transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let log = state.store.snapshot()?;
    let template = TransactionsTemplate::new(&log);
    render_page("Transactions", &template, &headers)
}

pub async fn portfolio_composition(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let log = state.store.snapshot()?;
    let rows = composition(&log);
    let template = CompositionTemplate { rows: &rows };
    render_page("Composition", &template, &headers)
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct AddTransactionForm {
    #[serde(default)]
    pub date: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub cash: Option<String>,
}

impl From<AddTransactionForm> for TransactionDraft {
    fn from(form: AddTransactionForm) -> Self {
        TransactionDraft {
            date: form.date,
            kind: form.kind,
            symbol: form.symbol,
            quantity: form.quantity,
            price: form.price,
            cash: form.cash,
        }
    }
}

pub async fn add_transaction(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AddTransactionForm>,
) -> Result<Response, WebError> {
    let draft = TransactionDraft::from(form);
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || store.append(&draft))
        .await
        .map_err(|e| WebError::internal(format!("append task failed: {e}")))??;
    Ok(Redirect::to("/").into_response())
}

pub async fn not_found() -> WebError {
    WebError::not_found("Page not found")
}
