use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use crate::codec::CookieCodec;
use crate::cookie::{find_cookie, CookieOptions};
use crate::extract::BearerToken;
use crate::session::{Session, SessionHandle};

/// Shared session configuration handed to [`resolve_session`].
#[derive(Clone)]
pub struct SessionManager {
    codec: Arc<dyn CookieCodec>,
    options: Arc<CookieOptions>,
}

impl SessionManager {
    pub fn new(codec: Arc<dyn CookieCodec>, options: CookieOptions) -> Self {
        Self {
            codec,
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }

    /// Build the inbound session from request headers. Never fails: a
    /// missing or unreadable cookie yields a fresh session.
    pub fn load(&self, headers: &HeaderMap) -> Session {
        let Some(raw) = find_cookie(headers, &self.options.name) else {
            return Session::fresh();
        };
        match self.codec.open(raw) {
            Ok(values) => Session::restored(values),
            Err(e) => {
                tracing::debug!(error = %e, "discarding session cookie");
                Session::fresh()
            }
        }
    }

    /// Write the outbound cookie onto `response` if the session calls for it.
    pub fn store(&self, session: &Session, response: &mut Response) {
        if !response.status().is_success() || !session.should_persist() {
            return;
        }
        let sealed = match self.codec.seal(&session.values) {
            Ok(sealed) => sealed,
            Err(e) => {
                tracing::warn!(error = %e, "failed to seal session cookie");
                return;
            }
        };
        match HeaderValue::from_str(&self.options.set_cookie(&sealed)) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "session cookie is not a valid header value"),
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(value: &HeaderValue) -> Option<String> {
    let (scheme, token) = value.to_str().ok()?.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Session middleware, installed with `axum::middleware::from_fn_with_state`.
///
/// Requests carrying a non-empty `Authorization` header skip cookie handling
/// entirely; a bearer token is passed on as a [`BearerToken`] extension.
/// Everything else gets a [`SessionHandle`] extension, and the cookie is
/// written back after the handler on 2xx responses.
pub async fn resolve_session(State(manager): State<SessionManager>, mut request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .filter(|value| !value.is_empty())
        .map(bearer_token);
    if let Some(bearer) = authorization {
        if let Some(token) = bearer {
            request.extensions_mut().insert(BearerToken(token));
        }
        return next.run(request).await;
    }

    let handle = SessionHandle::new(manager.load(request.headers()));
    request.extensions_mut().insert(handle.clone());

    let mut response = next.run(request).await;
    manager.store(&handle.snapshot(), &mut response);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SignedCookieCodec;
    use crate::extract::RequestSession;
    use axum::body::Body;
    use axum::extract::Path;
    use axum::http::header::COOKIE;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use fabl_types::AccountId;
    use tower::util::ServiceExt;

    fn manager() -> SessionManager {
        let codec = SignedCookieCodec::new("fabl_session", vec![b"test key".to_vec()], None).unwrap();
        let options = CookieOptions {
            secure: false,
            ..CookieOptions::default()
        };
        SessionManager::new(Arc::new(codec), options)
    }

    async fn whoami(RequestSession(session): RequestSession) -> Result<String, StatusCode> {
        match session {
            Some(session) => session
                .current_account()
                .map(|id| id.to_string())
                .map_err(|_| StatusCode::UNAUTHORIZED),
            None => Ok("no session".into()),
        }
    }

    async fn login(RequestSession(session): RequestSession, Path(id): Path<String>) -> StatusCode {
        let id: AccountId = match id.parse() {
            Ok(id) => id,
            Err(_) => return StatusCode::BAD_REQUEST,
        };
        if let Some(session) = session {
            session.login(id);
        }
        StatusCode::OK
    }

    async fn login_then_fail(RequestSession(session): RequestSession) -> StatusCode {
        if let Some(session) = session {
            session.login(AccountId::random());
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }

    async fn logout(RequestSession(session): RequestSession) -> StatusCode {
        if let Some(session) = session {
            session.logout();
        }
        StatusCode::OK
    }

    async fn bearer(token: Option<axum::Extension<BearerToken>>) -> String {
        token.map(|t| t.0 .0).unwrap_or_default()
    }

    fn app() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route("/login/:id", post(login))
            .route("/fail", post(login_then_fail))
            .route("/logout", post(logout))
            .route("/bearer", get(bearer))
            .layer(axum::middleware::from_fn_with_state(manager(), resolve_session))
    }

    fn request(method: &str, uri: &str, cookie: Option<&str>) -> Request {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    /// The `name=value` part of the response's Set-Cookie header.
    fn set_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get(SET_COOKIE)
            .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string())
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn anonymous_request_gets_no_cookie() {
        let response = app().oneshot(request("GET", "/whoami", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn login_sets_cookie_and_replay_resolves_account() {
        let app = app();
        let id = AccountId::random();
        let response = app
            .clone()
            .oneshot(request("POST", &format!("/login/{id}"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let header = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(header.contains("Path=/"));
        assert!(header.contains("HttpOnly"));
        let cookie = set_cookie(&response).unwrap();
        assert!(cookie.starts_with("fabl_session="));

        let response = app
            .clone()
            .oneshot(request("GET", "/whoami", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        // A restored session is written back on success.
        assert!(set_cookie(&response).is_some());
        assert_eq!(body_string(response).await, id.to_string());
    }

    #[tokio::test]
    async fn logout_clears_binding() {
        let app = app();
        let id = AccountId::random();
        let response = app
            .clone()
            .oneshot(request("POST", &format!("/login/{id}"), None))
            .await
            .unwrap();
        let cookie = set_cookie(&response).unwrap();

        let response = app
            .clone()
            .oneshot(request("POST", "/logout", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let anonymous = set_cookie(&response).expect("logout rewrites the cookie");

        let response = app
            .clone()
            .oneshot(request("GET", "/whoami", Some(&anonymous)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn error_response_does_not_persist_session() {
        let response = app().oneshot(request("POST", "/fail", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(set_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn bad_cookie_starts_fresh() {
        let response = app()
            .oneshot(request("GET", "/whoami", Some("fabl_session=garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn authorization_header_bypasses_sessions() {
        let app = app();
        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri("/bearer")
                    .header(AUTHORIZATION, "Bearer tok-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(set_cookie(&response).is_none());
        assert_eq!(body_string(response).await, "tok-123");

        // Login is a no-op without an attached session.
        let id = AccountId::random();
        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri(format!("/login/{id}"))
                    .header(AUTHORIZATION, "Basic abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_none());

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header(AUTHORIZATION, "Basic abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "no session");
    }

    #[tokio::test]
    async fn empty_authorization_header_keeps_sessions() {
        let app = app();
        let id = AccountId::random();
        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri(format!("/login/{id}"))
                    .header(AUTHORIZATION, "")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = set_cookie(&response).expect("session attached despite empty header");

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header(AUTHORIZATION, "")
                    .header(COOKIE, cookie.as_str())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_string(response).await, id.to_string());
    }

    #[test]
    fn bearer_parsing() {
        let parse = |s: &'static str| bearer_token(&HeaderValue::from_static(s));
        assert_eq!(parse("Bearer abc"), Some("abc".into()));
        assert_eq!(parse("bearer  abc "), Some("abc".into()));
        assert_eq!(parse("Basic abc"), None);
        assert_eq!(parse("Bearer "), None);
        assert_eq!(parse("Bearer"), None);
    }
}
