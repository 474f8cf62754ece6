//! Execution guard
//!
//! Runs one script under both budgets: the engine-level limits are armed
//! on the context, and the wall-clock deadline is enforced out here with
//! `tokio::time::timeout` around the blocking task. The context is
//! created, evaluated and harvested entirely inside the blocking closure,
//! which keeps Boa's non-`Send` context on a single thread.
//!
//! On any failure the staged response never leaves the closure, so a
//! timed-out or faulted run cannot leak partial writes.

use std::sync::Arc;

use scriptserve_common::error::{EngineError, Result};

use crate::request::RequestAdapter;
use crate::resource_limits::ResourceLimits;
use crate::response::ResponseState;
use crate::runtime::ScriptContext;

/// Result of a completed script run.
#[derive(Debug)]
pub struct ExecutionOutcome {
    /// Response state staged by the script.
    pub state: ResponseState,
    /// Explicit body from the script's completion value, when present.
    pub returned: Option<String>,
}

/// Evaluates a script against one request, bounded by `limits`.
///
/// When the wall-clock deadline fires the blocking task keeps running in
/// the background until the engine's own limits stop it; its result is
/// discarded either way.
pub async fn run_script(
    source: Arc<String>,
    route: String,
    adapter: RequestAdapter,
    limits: ResourceLimits,
) -> Result<ExecutionOutcome> {
    let timeout_ms = limits.timeout_ms();
    let deadline = limits.execution_timeout;

    let handle = tokio::task::spawn_blocking(move || {
        let span = tracing::debug_span!("script", route = %route);
        let _enter = span.enter();

        let mut ctx = ScriptContext::new(&adapter, &limits)?;
        let completion = ctx.eval(&source)?;
        let returned = ctx.returned_body(&completion)?;
        let state = ctx.harvest()?;
        Ok(ExecutionOutcome { state, returned })
    });

    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_error)) => Err(EngineError::ScriptFault(format!(
            "script worker panicked: {join_error}"
        ))),
        Err(_) => Err(EngineError::Timeout(timeout_ms)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use hyper::body::Bytes;
    use hyper::header::HeaderMap;
    use hyper::{Method, Uri, Version};

    fn adapter(uri: &str) -> RequestAdapter {
        let uri: Uri = uri.parse().unwrap();
        RequestAdapter::new(
            &Method::GET,
            &uri,
            Version::HTTP_11,
            &HeaderMap::new(),
            Bytes::new(),
            "127.0.0.1:50000".to_string(),
        )
    }

    #[tokio::test]
    async fn test_successful_run() {
        let outcome = run_script(
            Arc::new(r#"res.setContent("done");"#.to_string()),
            "/ok".to_string(),
            adapter("/ok"),
            ResourceLimits::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.state.content, "done");
        assert!(outcome.returned.is_none());
    }

    #[tokio::test]
    async fn test_wall_clock_timeout() {
        let limits = ResourceLimits::default()
            .with_execution_timeout(Duration::from_millis(50))
            .with_loop_iteration_limit(u64::MAX);
        let err = run_script(
            Arc::new("while (true) {}".to_string()),
            "/spin".to_string(),
            adapter("/spin"),
            limits,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::Timeout(50)));
    }

    #[tokio::test]
    async fn test_fault_discards_partial_writes() {
        let err = run_script(
            Arc::new(
                r#"
                    res.setHeader("X-Partial", "yes");
                    res.setContent("half written");
                    throw new Error("late failure");
                "#
                .to_string(),
            ),
            "/fault".to_string(),
            adapter("/fault"),
            ResourceLimits::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::ScriptFault(_)));
    }
}
