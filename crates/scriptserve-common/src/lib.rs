//! Scriptserve Common Types
//!
//! This crate provides the shared pieces of the scriptserve web server: the
//! error taxonomy, the layered server configuration, and small HTTP helpers
//! used by both the server and the CLI.
//!
//! # Overview
//!
//! Scriptserve is a lightweight web server for static content development and
//! prototyping route-based web APIs. Routes can be served from a static
//! document root or handled by JavaScript files executed in an embedded
//! engine. This crate contains what every component agrees on:
//!
//! - **Errors**: the [`EngineError`] taxonomy every request-handling failure
//!   collapses into
//! - **Configuration**: [`ServerConfig`] resolved from environment variables
//!   and CLI flags
//! - **HTTP helpers**: Hyper type aliases and plain-text response builders
//!
//! # Example
//!
//! ```
//! use scriptserve_common::{EngineError, ServerConfig};
//!
//! let config = ServerConfig::default();
//! assert_eq!(config.port, 8000);
//!
//! let err = EngineError::NotFound("/missing".into());
//! assert_eq!(err.status_code(), 404);
//! ```

pub mod config;
pub mod error;
pub mod http;

pub use config::ServerConfig;
pub use error::{EngineError, Result};
