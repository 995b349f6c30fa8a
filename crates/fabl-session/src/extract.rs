use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::session::SessionHandle;

/// Opaque token taken from `Authorization: Bearer <token>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BearerToken(pub String);

/// The request's session, if the session middleware attached one.
///
/// `None` when the request carried an `Authorization` header or when the
/// middleware is not installed. Never rejects.
#[derive(Clone, Debug)]
pub struct RequestSession(pub Option<SessionHandle>);

#[async_trait]
impl<S> FromRequestParts<S> for RequestSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<SessionHandle>().cloned()))
    }
}
