//! HTTP handlers, one module per route group.
//!
//! Each module exposes a `router()` that `main` nests under its path prefix.

pub mod analyze;
pub mod auth;
pub mod health;
pub mod photos;
pub mod search;
pub mod two_factor;
