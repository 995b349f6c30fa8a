use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use fabl_session::{BearerToken, SessionError, SessionHandle};
use fabl_store::StoreError;
use fabl_types::AccountId;

use crate::error::{ApiError, ApiResult};
use crate::handler::blocking;
use crate::state::AppState;

/// The calling account, resolved from a bearer token or else the session.
///
/// Rejects with 401 when neither yields an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Authenticated(pub AccountId);

/// Like [`Authenticated`], but an unauthenticated caller is `None` rather
/// than an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaybeAuthenticated(pub Option<AccountId>);

async fn resolve(parts: &Parts, state: &AppState) -> ApiResult<AccountId> {
    if let Some(BearerToken(token)) = parts.extensions.get::<BearerToken>() {
        let accounts = state.accounts().clone();
        let token = token.clone();
        let account = blocking(move || accounts.from_token(&token)).await?;
        return Ok(account.id);
    }
    let session = parts
        .extensions
        .get::<SessionHandle>()
        .ok_or(SessionError::Unauthenticated)?;
    Ok(session.current_account()?)
}

fn is_unauthenticated(e: &ApiError) -> bool {
    matches!(
        e,
        ApiError::Store(StoreError::Authentication) | ApiError::Session(SessionError::Unauthenticated)
    )
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await.map(Self)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await {
            Ok(id) => Ok(Self(Some(id))),
            Err(e) if is_unauthenticated(&e) => Ok(Self(None)),
            Err(e) => Err(e),
        }
    }
}
