//! HTTP layer
//!
//! Handlers for the landing page, the map endpoints, and the guarded upstream proxies.

pub mod handlers;
