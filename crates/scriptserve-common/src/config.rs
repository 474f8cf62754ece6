//! Server configuration
//!
//! Configuration is layered: every setting has a built-in default, can be
//! overridden by a `SCRIPTSERVE_*` environment variable, and finally by a
//! CLI flag. The CLI resolves the environment at flag-parse time, so a flag
//! always wins over the environment.

use std::path::PathBuf;

use crate::error::{EngineError, Result};

/// Default script execution deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Upper bound on the configurable script deadline (one hour).
pub const MAX_TIMEOUT_MS: u64 = 3_600_000;

/// Resolved server configuration.
///
/// # Example
///
/// ```
/// use scriptserve_common::ServerConfig;
///
/// let config = ServerConfig::default();
/// assert_eq!(config.hostname, "localhost");
/// assert_eq!(config.port, 8000);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Hostname to bind the listener to.
    pub hostname: String,
    /// Port to listen on.
    pub port: u16,
    /// Document root for static files.
    pub docroot: PathBuf,
    /// Directory of JavaScript route handlers.
    pub scripts_dir: PathBuf,
    /// When true, error responses carry script diagnostics.
    pub debug: bool,
    /// Wall-clock deadline per script run, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: 8000,
            docroot: PathBuf::from("static"),
            scripts_dir: PathBuf::from("scripts"),
            debug: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Address string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// True when a scripts directory is present and dynamic routes should
    /// be loaded.
    pub fn has_scripts(&self) -> bool {
        self.scripts_dir.is_dir()
    }

    /// Validates the configuration before the server starts.
    ///
    /// The document root must exist; the scripts directory is optional
    /// (a server can serve static files only). The timeout must be
    /// non-zero and at most [`MAX_TIMEOUT_MS`].
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(EngineError::InvalidConfig(
                "port must be non-zero".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(EngineError::InvalidConfig(format!(
                "timeout {}ms exceeds maximum of {}ms",
                self.timeout_ms, MAX_TIMEOUT_MS
            )));
        }
        if !self.docroot.is_dir() {
            return Err(EngineError::InvalidConfig(format!(
                "document root does not exist: {}",
                self.docroot.display()
            )));
        }
        Ok(())
    }
}

/// Reads a string setting from the environment, falling back to a default.
pub fn env_string(var: &str, default: &str) -> String {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

/// Reads a boolean setting from the environment.
///
/// Only the literal strings `true` and `false` (case-insensitive) are
/// recognized; anything else falls back to the default.
pub fn env_bool(var: &str, default: bool) -> bool {
    match std::env::var(var) {
        Ok(value) => match value.to_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Reads an integer setting from the environment.
///
/// Unparseable values fall back to the default rather than aborting, so a
/// stray value in the environment cannot prevent startup; validation of the
/// resolved configuration happens in [`ServerConfig::validate`].
pub fn env_u64(var: &str, default: u64) -> u64 {
    match std::env::var(var) {
        Ok(value) => value.parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Reads a port number from the environment.
pub fn env_u16(var: &str, default: u16) -> u16 {
    match std::env::var(var) {
        Ok(value) => value.parse().unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.hostname, "localhost");
        assert_eq!(config.port, 8000);
        assert_eq!(config.docroot, PathBuf::from("static"));
        assert_eq!(config.scripts_dir, PathBuf::from("scripts"));
        assert!(!config.debug);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn test_bind_addr() {
        let config = ServerConfig {
            hostname: "127.0.0.1".to_string(),
            port: 9000,
            ..ServerConfig::default()
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            docroot: dir.path().to_path_buf(),
            timeout_ms: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_excessive_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            docroot: dir.path().to_path_buf(),
            timeout_ms: MAX_TIMEOUT_MS + 1,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_docroot() {
        let config = ServerConfig {
            docroot: PathBuf::from("/no/such/directory/anywhere"),
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_accepts_existing_docroot() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            docroot: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_string_fallback() {
        assert_eq!(env_string("SCRIPTSERVE_TEST_UNSET_STR", "dflt"), "dflt");
        std::env::set_var("SCRIPTSERVE_TEST_SET_STR", "custom");
        assert_eq!(env_string("SCRIPTSERVE_TEST_SET_STR", "dflt"), "custom");
    }

    #[test]
    fn test_env_bool_parsing() {
        assert!(!env_bool("SCRIPTSERVE_TEST_UNSET_BOOL", false));
        std::env::set_var("SCRIPTSERVE_TEST_BOOL_TRUE", "True");
        assert!(env_bool("SCRIPTSERVE_TEST_BOOL_TRUE", false));
        std::env::set_var("SCRIPTSERVE_TEST_BOOL_JUNK", "yes");
        assert!(!env_bool("SCRIPTSERVE_TEST_BOOL_JUNK", false));
        assert!(env_bool("SCRIPTSERVE_TEST_BOOL_JUNK", true));
        std::env::set_var("SCRIPTSERVE_TEST_BOOL_FALSE", "false");
        assert!(!env_bool("SCRIPTSERVE_TEST_BOOL_FALSE", true));
    }

    #[test]
    fn test_env_numbers_fall_back_on_junk() {
        std::env::set_var("SCRIPTSERVE_TEST_U64_JUNK", "not-a-number");
        assert_eq!(env_u64("SCRIPTSERVE_TEST_U64_JUNK", 42), 42);
        std::env::set_var("SCRIPTSERVE_TEST_U16_OK", "8080");
        assert_eq!(env_u16("SCRIPTSERVE_TEST_U16_OK", 8000), 8080);
    }
}
