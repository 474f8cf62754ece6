//! Scriptserve Server
//!
//! This crate provides the HTTP serving layer and the embedded JavaScript
//! engine that executes route handler scripts against `Request`/`Response`
//! bindings.

pub mod dispatcher;
pub mod guard;
pub mod http_server;
pub mod request;
pub mod resource_limits;
pub mod response;
pub mod routes;
pub mod runtime;
pub mod static_files;

pub use dispatcher::RouteDispatcher;
pub use http_server::HttpServer;
pub use request::RequestAdapter;
pub use resource_limits::ResourceLimits;
pub use response::ResponseState;
