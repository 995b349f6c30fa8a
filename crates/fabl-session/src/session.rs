use std::sync::{Arc, Mutex};

use fabl_types::AccountId;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// Values carried inside the session cookie.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountId>,
}

/// Request-scoped session state.
///
/// `is_new` is set when no valid cookie arrived with the request. A new
/// session that never gets an account bound is not written back, so
/// anonymous browsing does not hand out cookies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub values: SessionValues,
    pub is_new: bool,
}

impl Session {
    /// Session for a request that carried no usable cookie.
    pub fn fresh() -> Self {
        Self {
            values: SessionValues::default(),
            is_new: true,
        }
    }

    /// Session restored from a cookie that opened successfully.
    pub fn restored(values: SessionValues) -> Self {
        Self {
            values,
            is_new: false,
        }
    }

    pub fn login(&mut self, account: AccountId) {
        self.values.account = Some(account);
    }

    pub fn logout(&mut self) {
        self.values.account = None;
    }

    pub fn current_account(&self) -> SessionResult<AccountId> {
        self.values.account.ok_or(SessionError::Unauthenticated)
    }

    /// Whether the cookie should be (re)written on the way out.
    pub fn should_persist(&self) -> bool {
        !(self.is_new && self.values.account.is_none())
    }
}

/// Shared handle to one request's session.
///
/// The middleware inserts a handle into the request extensions and keeps a
/// clone; after the handler returns it reads the final state back through
/// its clone.
#[derive(Clone, Debug, Default)]
pub struct SessionHandle(Arc<Mutex<Session>>);

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    pub fn login(&self, account: AccountId) {
        self.0.lock().expect("lock poisoned").login(account);
    }

    pub fn logout(&self) {
        self.0.lock().expect("lock poisoned").logout();
    }

    pub fn current_account(&self) -> SessionResult<AccountId> {
        self.0.lock().expect("lock poisoned").current_account()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Session {
        self.0.lock().expect("lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_not_persisted() {
        let s = Session::fresh();
        assert!(s.is_new);
        assert!(!s.should_persist());
        assert_eq!(s.current_account(), Err(SessionError::Unauthenticated));
    }

    #[test]
    fn login_on_fresh_session_persists() {
        let mut s = Session::fresh();
        let id = AccountId::random();
        s.login(id);
        assert!(s.should_persist());
        assert_eq!(s.current_account(), Ok(id));
    }

    #[test]
    fn restored_anonymous_session_persists() {
        let s = Session::restored(SessionValues::default());
        assert!(s.should_persist());
    }

    #[test]
    fn logout_clears_binding() {
        let id = AccountId::random();
        let mut s = Session::restored(SessionValues { account: Some(id) });
        s.logout();
        assert!(s.current_account().is_err());
        // Still written back so the browser drops the old binding.
        assert!(s.should_persist());
    }

    #[test]
    fn login_then_logout_on_fresh_session_is_not_persisted() {
        let mut s = Session::fresh();
        s.login(AccountId::random());
        s.logout();
        assert!(!s.should_persist());
    }

    #[test]
    fn handle_clones_share_state() {
        let handle = SessionHandle::new(Session::fresh());
        let other = handle.clone();
        let id = AccountId::random();
        other.login(id);
        assert_eq!(handle.current_account(), Ok(id));
        handle.logout();
        assert!(other.current_account().is_err());
        assert!(handle.snapshot().is_new);
    }

    #[test]
    fn values_serde_shape() {
        let id = AccountId::random();
        let json = serde_json::to_string(&SessionValues { account: Some(id) }).unwrap();
        assert_eq!(json, format!("{{\"account\":\"{id}\"}}"));
        let empty = serde_json::to_string(&SessionValues::default()).unwrap();
        assert_eq!(empty, "{}");
        let back: SessionValues = serde_json::from_str("{}").unwrap();
        assert_eq!(back, SessionValues::default());
    }
}
