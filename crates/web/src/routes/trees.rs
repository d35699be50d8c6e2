//! Tree pages: the overview, a single tree's history, bulk status updates
//! and adding trees.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use tracing::info;

use treestatus_core::api;
use treestatus_core::forms::{FormData, NewTreeForm, UpdateTreesForm};

use crate::flash::{self, Flash};
use crate::render::{self, PageContext};
use crate::routes::changes::apply;
use crate::routes::status::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(|| async { Redirect::to(flash::DEFAULT_RETURN_PATH) }))
        .route("/treestatus", get(list_trees).post(update_trees))
        .route("/treestatus/new_tree", post(new_tree))
        .route("/treestatus/{tree}", get(show_tree))
}

/// Wrap a rendered page, clearing any flash cookie that was just shown.
pub(crate) fn page(html: String, flashes: &[Flash]) -> Response {
    if flashes.is_empty() {
        Html(html).into_response()
    } else {
        ([(SET_COOKIE, flash::clear_cookie_value())], Html(html)).into_response()
    }
}

async fn list_trees(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let client = state.api.as_ref();
    let (trees, stack) = tokio::try_join!(api::get_trees(client), api::get_stack(client))?;

    let flashes = flash::read(&headers);
    let ctx = PageContext {
        title: &state.config.ui.title,
        flashes: &flashes,
    };
    Ok(page(render::trees_page(&ctx, &trees, &stack), &flashes))
}

async fn show_tree(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let client = state.api.as_ref();
    let (tree, logs) = tokio::try_join!(api::get_tree(client, &name), api::get_tree_logs(client, &name))?;

    let flashes = flash::read(&headers);
    let ctx = PageContext {
        title: &state.config.ui.title,
        flashes: &flashes,
    };
    Ok(page(render::tree_page(&ctx, &tree, &logs), &flashes))
}

async fn update_trees(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = UpdateTreesForm::parse(&FormData::new(pairs))?;
    info!(trees = ?form.trees, status = %form.status, "updating tree statuses");
    apply(&state, &headers, &form.into_action()).await
}

async fn new_tree(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = NewTreeForm::parse(&FormData::new(pairs))?;
    info!(tree = %form.tree, "adding tree");
    apply(&state, &headers, &form.into_action()).await
}
