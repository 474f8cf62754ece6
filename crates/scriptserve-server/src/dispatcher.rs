//! Route dispatcher
//!
//! Drives one request through its stages: resolve the path to a script,
//! load the cached source, execute under the guard, then finalize the
//! staged response into the wire response. A failure at any stage stops
//! the run; there are no retries. Paths with no backing script fall
//! through to the static file engine.
//!
//! Script failures surface as a generic 500 in production. With debug
//! enabled the error text goes to the client instead, which is how broken
//! handlers are diagnosed during development.

use std::time::Instant;

use hyper::StatusCode;

use scriptserve_common::error::{EngineError, Result};
use scriptserve_common::http::{status_response, text_response, HyperResponse};

use crate::guard;
use crate::request::RequestAdapter;
use crate::resource_limits::ResourceLimits;
use crate::routes::ScriptCache;
use crate::runtime::{PoolConfig, ScriptContextPool};
use crate::static_files::StaticFiles;

/// Per-request pipeline shared by every connection.
pub struct RouteDispatcher {
    scripts: Option<ScriptCache>,
    statics: StaticFiles,
    limits: ResourceLimits,
    pool: ScriptContextPool,
    debug: bool,
}

impl RouteDispatcher {
    pub fn new(
        scripts: Option<ScriptCache>,
        statics: StaticFiles,
        limits: ResourceLimits,
        pool_config: PoolConfig,
        debug: bool,
    ) -> Self {
        Self {
            scripts,
            statics,
            limits,
            pool: ScriptContextPool::new(pool_config),
            debug,
        }
    }

    /// Handles one request end to end. Always produces a response; errors
    /// are rendered, never propagated to the connection loop.
    pub async fn dispatch(&self, adapter: RequestAdapter) -> HyperResponse {
        let started = Instant::now();
        let method = adapter.method().to_string();
        let path = adapter.path().to_string();
        let remote = adapter.remote_addr().to_string();

        let response = match self.run(adapter).await {
            Ok(response) => response,
            Err(error) => self.render_error(&error),
        };

        tracing::info!(
            method,
            path,
            remote,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request"
        );
        response
    }

    async fn run(&self, adapter: RequestAdapter) -> Result<HyperResponse> {
        let path = adapter.path().to_string();

        tracing::trace!(path, phase = "resolving");
        let resource = match &self.scripts {
            Some(cache) => cache.resolve(&path)?,
            None => None,
        };

        let Some(resource) = resource else {
            tracing::trace!(path, phase = "static");
            return self.statics.serve(&path).await;
        };

        tracing::trace!(path, phase = "loading_script");
        if let Some(error) = &resource.compile_error {
            return Err(EngineError::CompileFailure(error.clone()));
        }

        tracing::trace!(path, phase = "executing");
        let _slot = self.pool.acquire().await?;
        let outcome = guard::run_script(
            resource.source.clone(),
            resource.route.clone(),
            adapter,
            self.limits.clone(),
        )
        .await?;

        tracing::trace!(path, phase = "finalizing");
        Ok(outcome.state.finalize(outcome.returned))
    }

    /// Renders an error as the client-visible response.
    ///
    /// Script diagnostics stay in the log unless debug mode is on; the
    /// client sees the bare status line.
    fn render_error(&self, error: &EngineError) -> HyperResponse {
        let status =
            StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if error.is_script_error() {
            tracing::error!(%error, "script execution failed");
            if self.debug {
                return text_response(status, error.to_string());
            }
            return status_response(status);
        }

        tracing::debug!(%error, "request rejected");
        status_response(status)
    }
}
