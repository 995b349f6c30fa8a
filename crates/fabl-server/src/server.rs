use std::sync::Arc;

use fabl_session::{CookieCodec, CookieOptions, SessionManager, SignedCookieCodec};
use tokio::net::TcpListener;

use crate::config::{ServerConfig, SessionConfig};
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// fabl HTTP server.
pub struct FablServer {
    config: ServerConfig,
    state: AppState,
    sessions: SessionManager,
}

impl FablServer {
    /// Open the database and set up sessions from `config`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let state = AppState::from_config(&config)?;
        Self::with_state(config, state)
    }

    /// Use pre-built services instead of the configured database.
    pub fn with_state(config: ServerConfig, state: AppState) -> ServerResult<Self> {
        let sessions = session_manager(&config.session)?;
        Ok(Self {
            config,
            state,
            sessions,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.sessions.clone(), &self.config)
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("fabl server listening on {}", self.config.bind_addr);
        axum::serve(listener, app).await?;
        Ok(())
    }
}

fn session_manager(config: &SessionConfig) -> ServerResult<SessionManager> {
    let codec: Arc<dyn CookieCodec> = if config.keys.is_empty() {
        Arc::new(SignedCookieCodec::with_random_key(
            config.cookie_name.clone(),
            config.max_age(),
        ))
    } else {
        let keys = config.keys.iter().map(|k| k.as_bytes().to_vec()).collect();
        Arc::new(
            SignedCookieCodec::new(config.cookie_name.clone(), keys, config.max_age())
                .map_err(|e| ServerError::Config(e.to_string()))?,
        )
    };
    let options = CookieOptions {
        name: config.cookie_name.clone(),
        domain: config.domain.clone(),
        max_age: config.max_age(),
        secure: config.secure,
    };
    Ok(SessionManager::new(codec, options))
}
