use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fabl_session::DEFAULT_COOKIE_NAME;
use fabl_store::{DEFAULT_MAX_BLOB_BYTES, DEFAULT_PASSWORD_COST};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub cors: CorsConfig,
    pub request_timeout_secs: u64,
    pub max_blueprint_bytes: usize,
    /// bcrypt work factor for newly hashed passwords.
    pub password_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database: DatabaseConfig::default(),
            session: SessionConfig::default(),
            cors: CorsConfig::default(),
            request_timeout_secs: 30,
            max_blueprint_bytes: DEFAULT_MAX_BLOB_BYTES,
            password_cost: DEFAULT_PASSWORD_COST,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Largest request body accepted: a base64 import string whose zlib
    /// payload is no larger than the blueprint limit, plus headroom.
    pub fn max_body_bytes(&self) -> usize {
        self.max_blueprint_bytes / 3 * 4 + 4096
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DatabaseConfig {
    #[default]
    Memory,
    Sqlite { path: PathBuf },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Signing keys, newest first. Empty means a random per-process key.
    pub keys: Vec<String>,
    pub domain: Option<String>,
    pub max_age_secs: Option<u64>,
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.into(),
            keys: Vec::new(),
            domain: None,
            max_age_secs: None,
            secure: true,
        }
    }
}

impl SessionConfig {
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origin patterns; `*` matches any run of characters.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:*".into()],
        }
    }
}

impl CorsConfig {
    pub fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|pattern| glob_match(pattern, origin))
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    let mut segments: Vec<&str> = parts.collect();
    let Some(last) = segments.pop() else {
        // No `*` in the pattern.
        return rest.is_empty();
    };
    for segment in segments {
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(c.database, DatabaseConfig::Memory);
        assert_eq!(c.request_timeout(), Duration::from_secs(30));
        assert_eq!(c.max_blueprint_bytes, 16 * 1024 * 1024);
        assert_eq!(c.password_cost, DEFAULT_PASSWORD_COST);
        assert_eq!(c.session.cookie_name, "fabl_session");
        assert!(c.session.secure);
        assert!(c.session.keys.is_empty());
        assert!(c.cors.allows("http://localhost:3000"));
        assert!(!c.cors.allows("https://example.com"));
    }

    #[test]
    fn parse_toml() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:9000"
            request_timeout_secs = 5
            password_cost = 10

            [database]
            kind = "sqlite"
            path = "/var/lib/fabl/fabl.db"

            [session]
            keys = ["new", "old"]
            max_age_secs = 86400
            secure = false

            [cors]
            allowed_origins = ["https://*.fabl.app"]
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.request_timeout_secs, 5);
        assert_eq!(c.password_cost, 10);
        assert_eq!(
            c.database,
            DatabaseConfig::Sqlite {
                path: "/var/lib/fabl/fabl.db".into()
            }
        );
        assert_eq!(c.session.keys, vec!["new", "old"]);
        assert_eq!(c.session.max_age(), Some(Duration::from_secs(86400)));
        assert_eq!(c.session.cookie_name, "fabl_session");
        assert!(!c.session.secure);
        assert!(c.cors.allows("https://www.fabl.app"));
        // Unset keys keep their defaults.
        assert_eq!(c.max_blueprint_bytes, DEFAULT_MAX_BLOB_BYTES);
    }

    #[test]
    fn empty_toml_is_default() {
        let c = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(c.bind_addr, ServerConfig::default().bind_addr);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(
            ServerConfig::from_toml_str("bind_addr = 12"),
            Err(ServerError::Config(_))
        ));
        assert!(matches!(
            ServerConfig::load("/nonexistent/fabl.toml"),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fabl.toml");
        std::fs::write(&path, "request_timeout_secs = 7\n").unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap().request_timeout_secs, 7);
    }

    #[test]
    fn origin_globs() {
        assert!(glob_match("https://fabl.app", "https://fabl.app"));
        assert!(!glob_match("https://fabl.app", "https://fabl.app.evil"));
        assert!(glob_match("https://*.fabl.app", "https://beta.fabl.app"));
        assert!(!glob_match("https://*.fabl.app", "https://fabl.app"));
        assert!(!glob_match("https://*.fabl.app", "http://beta.fabl.app"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("http://localhost:*", "http://localhost:3000"));
        assert!(glob_match("https://*-preview.*.app", "https://pr1-preview.fabl.app"));
        assert!(!glob_match("a*a", "a"));

        let cors = CorsConfig {
            allowed_origins: Vec::new(),
        };
        assert!(!cors.allows("http://localhost:3000"));
    }
}
