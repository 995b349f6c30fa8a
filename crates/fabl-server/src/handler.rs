use axum::extract::{Path, State};
use axum::response::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fabl_session::RequestSession;
use fabl_store::{Cancellation, StoreResult};
use fabl_types::{AccountId, ItemId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::{Authenticated, MaybeAuthenticated};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Run a synchronous store call off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

fn parse_item_id(raw: &str) -> ApiResult<ItemId> {
    Ok(raw.parse()?)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: ItemId,
    /// SHA-256 of the blob, base64.
    pub sum: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListItemsResponse {
    pub items: Vec<ItemSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportRequest {
    /// Creation time in Unix milliseconds. Absent or zero means now.
    #[serde(default)]
    pub time_ms: Option<u64>,
    pub import_string: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub id: ItemId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemDataResponse {
    /// Raw blueprint bytes, base64.
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportResponse {
    pub import_string: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountView {
    pub id: AccountId,
    pub nickname: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account: AccountView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub id: String,
    pub password: String,
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "fabl-server",
        "version": env!("CARGO_PKG_VERSION"),
        "max_blueprint_bytes": state.items().max_blob_bytes(),
    }))
}

/// `GET /v1/items`: the caller's items, oldest first. Anonymous callers
/// get an empty list.
pub async fn list_items(
    State(state): State<AppState>,
    MaybeAuthenticated(owner): MaybeAuthenticated,
) -> ApiResult<Json<ListItemsResponse>> {
    let Some(owner) = owner else {
        return Ok(Json(ListItemsResponse { items: Vec::new() }));
    };
    let items = state.items().clone();
    let records = blocking(move || items.list(&owner)).await?;
    Ok(Json(ListItemsResponse {
        items: records
            .into_iter()
            .map(|r| ItemSummary {
                id: r.id,
                sum: STANDARD.encode(r.sum.as_bytes()),
            })
            .collect(),
    }))
}

/// `POST /v1/items/import`
pub async fn import_item(
    State(state): State<AppState>,
    Authenticated(owner): Authenticated,
    Json(req): Json<ImportRequest>,
) -> ApiResult<Json<ImportResponse>> {
    let items = state.items().clone();
    let time_ms = req.time_ms.unwrap_or(0);
    let cancel = Cancellation::new();
    // Dropping this future (timeout, client gone) cancels the import before commit.
    let guard = cancel.drop_guard();
    let result = blocking(move || items.import_cancellable(owner, &req.import_string, time_ms, &cancel)).await;
    guard.disarm();
    Ok(Json(ImportResponse { id: result?.id }))
}

/// `GET /v1/items/:id`
pub async fn get_item(
    State(state): State<AppState>,
    Authenticated(owner): Authenticated,
    Path(id): Path<String>,
) -> ApiResult<Json<ItemDataResponse>> {
    let id = parse_item_id(&id)?;
    let items = state.items().clone();
    let item = blocking(move || items.get(&owner, &id)).await?;
    Ok(Json(ItemDataResponse {
        data: STANDARD.encode(&item.data),
    }))
}

/// `GET /v1/items/:id/export`
pub async fn export_item(
    State(state): State<AppState>,
    Authenticated(owner): Authenticated,
    Path(id): Path<String>,
) -> ApiResult<Json<ExportResponse>> {
    let id = parse_item_id(&id)?;
    let items = state.items().clone();
    let import_string = blocking(move || items.export(&owner, &id)).await?;
    Ok(Json(ExportResponse { import_string }))
}

/// `GET /v1/account`
pub async fn get_account(
    State(state): State<AppState>,
    Authenticated(id): Authenticated,
) -> ApiResult<Json<AccountResponse>> {
    let accounts = state.accounts().clone();
    let account = blocking(move || accounts.get(&id)).await?;
    Ok(Json(AccountResponse {
        account: AccountView {
            id: account.id,
            nickname: account.nickname,
        },
    }))
}

/// `POST /v1/account/login`: verify credentials and bind the account to
/// the session. Requests without a session (bearer callers) verify but
/// bind nothing.
pub async fn login(
    State(state): State<AppState>,
    RequestSession(session): RequestSession,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let id: AccountId = req.id.parse()?;
    let accounts = state.accounts().clone();
    let account = blocking(move || accounts.verify_credentials(&id, &req.password)).await?;
    if let Some(session) = session {
        session.login(account.id);
    }
    tracing::info!(account = %account.id, "login");
    Ok(Json(json!({})))
}

/// `POST /v1/account/logout`
pub async fn logout(RequestSession(session): RequestSession) -> Json<Value> {
    if let Some(session) = session {
        session.logout();
    }
    Json(json!({}))
}
