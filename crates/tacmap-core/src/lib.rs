//! Core abstractions for the TacMap offline worker.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `WorkerConfig` - Store names, tile limits, host lists and the shell manifest
//! - `Request` / `RequestKey` - Intercepted requests and their cache identity
//! - `Response` - Status, headers and body of a fetched or stored response
//! - `WorkerState` / `ControlMessage` - Lifecycle states and host commands

mod config;
mod context;
mod lifecycle;
mod response;

pub use config::*;
pub use context::*;
pub use lifecycle::*;
pub use response::*;
