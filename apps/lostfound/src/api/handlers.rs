//! Route handlers.
//!
//! Each handler locks the catalog, runs one operation and returns JSON.
//! The wall clock is read here.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use lostfound_core::search::PAGE_SIZE;
use lostfound_core::{
    Claim, ClaimId, Dashboard, Home, Item, ItemDetail, ItemForm, ItemId, ItemType, Reported,
    ShareLink, Statistics, SuccessDashboard, User, paginate,
};
use tracing::{debug, info};

use super::AppState;
use super::auth::{Actor, Viewer};
use super::error::ApiError;
use super::types::{
    HealthResponse, ItemsByDateQuery, ItemsByDateResponse, ItemsQuery, ModerateRequest,
    NotificationSummary, RegisterRequest, RunMatchingQuery, RunMatchingResponse, SearchResponse,
};
use crate::notifier::{LogNotifier, deliver_run};

type ApiResult<T> = Result<Json<T>, ApiError>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn path_id(path: Result<Path<u64>, PathRejection>) -> Result<u64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(value)| value)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

// =============================================================================
// PUBLIC PAGES
// =============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn home(State(state): State<Arc<AppState>>) -> ApiResult<Home> {
    let catalog = state.catalog.lock().await;
    Ok(Json(catalog.home(Utc::now())?))
}

pub async fn statistics(State(state): State<Arc<AppState>>) -> ApiResult<Statistics> {
    let catalog = state.catalog.lock().await;
    Ok(Json(catalog.statistics(Utc::now())?))
}

pub async fn success_dashboard(State(state): State<Arc<AppState>>) -> ApiResult<SuccessDashboard> {
    let catalog = state.catalog.lock().await;
    Ok(Json(catalog.success_dashboard(Utc::now())?))
}

pub async fn items_by_date(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ItemsByDateQuery>, QueryRejection>,
) -> ApiResult<ItemsByDateResponse> {
    let query = params(query)?;
    let catalog = state.catalog.lock().await;
    let data = catalog.items_by_date(Utc::now(), query.days())?;
    Ok(Json(ItemsByDateResponse { data }))
}

// =============================================================================
// USERS
// =============================================================================

pub async fn register_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let request = body(payload)?;
    let mut catalog = state.catalog.lock().await;
    let user = catalog.register_user(&request.username, &request.email, Utc::now())?;
    info!(user = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Actor(user): Actor,
) -> ApiResult<Dashboard> {
    let catalog = state.catalog.lock().await;
    Ok(Json(catalog.dashboard(user.id)?))
}

// =============================================================================
// ITEMS
// =============================================================================

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ItemsQuery>, QueryRejection>,
) -> ApiResult<SearchResponse> {
    let filters = params(query)?;
    let query = filters.to_search()?;
    let catalog = state.catalog.lock().await;
    let outcome = catalog.search(&query)?;
    debug!(tier = ?outcome.tier, rows = outcome.items.len(), "search finished");

    let relaxed = outcome.performed && outcome.tier.is_relaxed();
    let message =
        relaxed.then(|| format!("No exact results, showing {}", outcome.tier.describe()));
    Ok(Json(SearchResponse {
        search_performed: outcome.performed,
        relaxed,
        tier: outcome.tier,
        message,
        total_items: outcome.total_items,
        page: paginate(outcome.items, filters.page.as_deref(), PAGE_SIZE),
    }))
}

async fn report(
    state: &AppState,
    user: &User,
    item_type: ItemType,
    form: ItemForm,
) -> Result<(StatusCode, Json<Reported>), ApiError> {
    let mut catalog = state.catalog.lock().await;
    let reported = catalog.report_item(user.id, item_type, form, Utc::now())?;
    info!(
        item = %reported.item.id,
        owner = %user.id,
        item_type = %item_type,
        matches = reported.matches.len(),
        "item reported"
    );
    Ok((StatusCode::CREATED, Json(reported)))
}

pub async fn report_lost(
    State(state): State<Arc<AppState>>,
    Actor(user): Actor,
    payload: Result<Json<ItemForm>, JsonRejection>,
) -> Result<(StatusCode, Json<Reported>), ApiError> {
    report(&state, &user, ItemType::Lost, body(payload)?).await
}

pub async fn report_found(
    State(state): State<Arc<AppState>>,
    Actor(user): Actor,
    payload: Result<Json<ItemForm>, JsonRejection>,
) -> Result<(StatusCode, Json<Reported>), ApiError> {
    report(&state, &user, ItemType::Found, body(payload)?).await
}

pub async fn item_detail(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<ItemDetail> {
    let id = path_id(path)?;
    let catalog = state.catalog.lock().await;
    Ok(Json(catalog.item_detail(viewer, ItemId(id))?))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Actor(user): Actor,
    path: Result<Path<u64>, PathRejection>,
    payload: Result<Json<ItemForm>, JsonRejection>,
) -> ApiResult<Item> {
    let id = path_id(path)?;
    let form = body(payload)?;
    let mut catalog = state.catalog.lock().await;
    let item = catalog.update_item(user.id, ItemId(id), form, Utc::now())?;
    info!(item = %item.id, "item updated");
    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Actor(user): Actor,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<Item> {
    let id = path_id(path)?;
    let mut catalog = state.catalog.lock().await;
    let item = catalog.delete_item(user.id, ItemId(id))?;
    info!(item = %item.id, "item deleted");
    Ok(Json(item))
}

pub async fn share_item(
    State(state): State<Arc<AppState>>,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<ShareLink> {
    let id = path_id(path)?;
    let catalog = state.catalog.lock().await;
    Ok(Json(catalog.share(ItemId(id), &state.config.public_url)?))
}

// =============================================================================
// CLAIMS
// =============================================================================

pub async fn claim_item(
    State(state): State<Arc<AppState>>,
    Actor(user): Actor,
    path: Result<Path<u64>, PathRejection>,
) -> Result<(StatusCode, Json<Claim>), ApiError> {
    let id = path_id(path)?;
    let mut catalog = state.catalog.lock().await;
    let claim = catalog.claim_item(user.id, ItemId(id), Utc::now())?;
    info!(claim = %claim.id, item = %claim.item, by = %user.id, "claim submitted");
    Ok((StatusCode::CREATED, Json(claim)))
}

pub async fn mark_returned(
    State(state): State<Arc<AppState>>,
    Actor(user): Actor,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<Item> {
    let id = path_id(path)?;
    let mut catalog = state.catalog.lock().await;
    let item = catalog.mark_returned(user.id, ItemId(id), Utc::now())?;
    info!(item = %item.id, by = %user.id, "item returned");
    Ok(Json(item))
}

pub async fn approve_claim(
    State(state): State<Arc<AppState>>,
    Actor(user): Actor,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<Claim> {
    let id = path_id(path)?;
    let mut catalog = state.catalog.lock().await;
    let claim = catalog.approve_claim(user.id, ClaimId(id), Utc::now())?;
    info!(claim = %claim.id, item = %claim.item, "claim approved");
    Ok(Json(claim))
}

pub async fn reject_claim(
    State(state): State<Arc<AppState>>,
    Actor(user): Actor,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<Claim> {
    let id = path_id(path)?;
    let mut catalog = state.catalog.lock().await;
    let claim = catalog.reject_claim(user.id, ClaimId(id))?;
    info!(claim = %claim.id, item = %claim.item, "claim rejected");
    Ok(Json(claim))
}

// =============================================================================
// ADMIN
// =============================================================================

pub async fn pending_items(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Item>> {
    let catalog = state.catalog.lock().await;
    Ok(Json(catalog.pending_items()?))
}

pub async fn moderate_item(
    State(state): State<Arc<AppState>>,
    path: Result<Path<u64>, PathRejection>,
    payload: Result<Json<ModerateRequest>, JsonRejection>,
) -> ApiResult<Item> {
    let id = path_id(path)?;
    let request = body(payload)?;
    let mut catalog = state.catalog.lock().await;
    let item = catalog.moderate_item(ItemId(id), request.decision, Utc::now())?;
    info!(item = %item.id, status = %item.status, "item moderated");
    Ok(Json(item))
}

pub async fn run_matching(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RunMatchingQuery>, QueryRejection>,
) -> ApiResult<RunMatchingResponse> {
    let options = params(query)?;
    let now = Utc::now();
    let mut catalog = state.catalog.lock().await;
    let batch = catalog.run_batch_matching(now)?;
    info!(
        pairs = batch.pairs_examined,
        created = batch.created.len(),
        "batch matching finished"
    );

    let notifications = if options.notify {
        let run = catalog.run_notifications(now, &state.config.public_url)?;
        let delivered = deliver_run(&LogNotifier, &run);
        Some(NotificationSummary {
            match_messages: run.match_messages,
            reminders: run.reminders,
            failed: delivered.failed,
            metrics: run.metrics,
        })
    } else {
        None
    };

    Ok(Json(RunMatchingResponse {
        pairs_examined: batch.pairs_examined,
        created: batch.created,
        notifications,
    }))
}
