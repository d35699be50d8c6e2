//! Edits to recorded changes: the recent-changes stack and tree log entries.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::post;
use axum::{Form, Router};

use treestatus_core::errors::ResolveError;
use treestatus_core::forms::{FormData, LogUpdateForm, RecentChangeForm};
use treestatus_core::resolver::{self, ActionOutcome, ResolvedAction};

use crate::flash::{self, Flash};
use crate::routes::status::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/treestatus/stack/{id}", post(update_change))
        .route("/treestatus/log/{id}", post(update_log))
}

async fn update_change(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let change_id = parse_id(&id)?;
    let resolved = RecentChangeForm::parse(&FormData::new(pairs)).resolve(change_id)?;
    apply(&state, &headers, &resolved).await
}

async fn update_log(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let log_id = parse_id(&id)?;
    let resolved = LogUpdateForm::parse(&FormData::new(pairs)).resolve(log_id)?;
    apply(&state, &headers, &resolved).await
}

fn parse_id(raw: &str) -> Result<u64, ResolveError> {
    raw.parse()
        .map_err(|_| ResolveError::InvalidId(raw.to_string()))
}

/// Send a resolved action and turn the outcome into a response.
///
/// Success flashes the message and redirects to the referring page. A
/// rejection shows the API's detail in place. Other failures propagate.
pub(crate) async fn apply(
    state: &AppState,
    headers: &HeaderMap,
    resolved: &ResolvedAction,
) -> Result<Response, AppError> {
    match resolver::complete(state.api.as_ref(), resolved).await? {
        ActionOutcome::Succeeded(message) => Ok(flash::redirect_with(
            &flash::local_referrer(headers),
            Flash::success(message),
        )),
        ActionOutcome::Rejected(detail) => Err(AppError::Rejected(detail)),
    }
}
