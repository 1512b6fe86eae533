//! Network fetch primitive.
//!
//! This crate provides:
//! - `Fetcher` - The seam through which every outbound request goes
//! - `FetchError` - Why a request produced no response at all
//! - `HttpFetcher` - Real network access over `reqwest`
//! - `StaticFetcher` - Scripted responses for development and testing

mod client;
mod error;
mod static_fetcher;

pub use client::*;
pub use error::*;
pub use static_fetcher::*;
