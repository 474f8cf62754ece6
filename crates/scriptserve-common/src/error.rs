use thiserror::Error;

/// Failure taxonomy for request handling and startup.
///
/// Script-originating failures (`CompileFailure`, `Timeout`, `ScriptFault`)
/// are always caught at the execution boundary and turned into error
/// responses; they never propagate far enough to take the host down.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No handler for route: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Script failed to compile: {0}")]
    CompileFailure(String),

    #[error("Script execution timed out after {0}ms")]
    Timeout(u64),

    #[error("Script fault: {0}")]
    ScriptFault(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// HTTP status code this error maps to when it reaches the client.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::NotFound(_) => 404,
            EngineError::Forbidden(_) => 401,
            EngineError::InvalidRequest(_) => 400,
            EngineError::CompileFailure(_)
            | EngineError::Timeout(_)
            | EngineError::ScriptFault(_)
            | EngineError::InvalidConfig(_)
            | EngineError::Io(_) => 500,
        }
    }

    /// True when the error came from inside a script run rather than from
    /// the host, so diagnostics should only be shown in debug mode.
    pub fn is_script_error(&self) -> bool {
        matches!(
            self,
            EngineError::CompileFailure(_) | EngineError::Timeout(_) | EngineError::ScriptFault(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(EngineError::NotFound("/x".into()).status_code(), 404);
        assert_eq!(EngineError::Forbidden("/.git".into()).status_code(), 401);
        assert_eq!(EngineError::Timeout(5000).status_code(), 500);
        assert_eq!(EngineError::ScriptFault("boom".into()).status_code(), 500);
        assert_eq!(EngineError::CompileFailure("bad".into()).status_code(), 500);
        assert_eq!(EngineError::InvalidRequest("no".into()).status_code(), 400);
    }

    #[test]
    fn test_script_errors_flagged() {
        assert!(EngineError::Timeout(1).is_script_error());
        assert!(EngineError::ScriptFault("x".into()).is_script_error());
        assert!(EngineError::CompileFailure("x".into()).is_script_error());
        assert!(!EngineError::NotFound("/x".into()).is_script_error());
        assert!(!EngineError::InvalidConfig("x".into()).is_script_error());
    }

    #[test]
    fn test_display_messages() {
        let err = EngineError::Timeout(250);
        assert_eq!(err.to_string(), "Script execution timed out after 250ms");

        let err = EngineError::NotFound("/missing".into());
        assert!(err.to_string().contains("/missing"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
        assert_eq!(err.status_code(), 500);
    }
}
