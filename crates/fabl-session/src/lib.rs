//! Cookie-backed sessions for fabl's HTTP layer.
//!
//! A request is in one of three states: *fresh* (no valid cookie),
//! *anonymous* (valid cookie, no account) or *authenticated* (valid cookie
//! with an account bound). Requests that carry an `Authorization` header
//! bypass sessions and are identified by their bearer token instead.
//!
//! [`resolve_session`] is the middleware; handlers reach the session through
//! the [`RequestSession`] extractor. Cookie values are produced by a
//! [`CookieCodec`], by default the HMAC-signed [`SignedCookieCodec`].

pub mod codec;
pub mod cookie;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod session;

pub use codec::{CookieCodec, SignedCookieCodec};
pub use cookie::{CookieOptions, DEFAULT_COOKIE_NAME};
pub use error::{SessionError, SessionResult};
pub use extract::{BearerToken, RequestSession};
pub use middleware::{resolve_session, SessionManager};
pub use session::{Session, SessionHandle, SessionValues};
