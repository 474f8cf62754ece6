pub mod context;
pub mod pool;

mod bindings;
mod conversions;


pub use context::ScriptContext;
pub use pool::{PoolConfig, ScriptContextPool};
