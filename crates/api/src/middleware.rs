//! Request extractors shared by handlers.
//!
//! - **auth** - `AuthUser`, a verified bearer token
//! - **rate_limit** - `RateLimited`, admits the request through the per-client limiter
//! - **origin** - `RequestOrigin`, scheme and host used to build absolute URLs
//! - **payload** - `AppJson`, `AppQuery`, `AppMultipart`, body and query decoding with JSON errors

pub mod auth;
pub mod origin;
pub mod payload;
pub mod rate_limit;
