//! Services and external collaborators.
//!
//! Each collaborator is abstracted behind a trait to enable mocking in tests.
//!
//! ## Services
//!
//! - **credentials** - Account creation and password authentication (bcrypt)
//! - **tokens** - Bearer token issue/verify (HS256 JWT)
//! - **otp** - One-time passcodes for the email second factor
//! - **email** - Transactional email via Resend or SMTP
//! - **geocode** - Reverse geocoding for photo locations (Nominatim)
//! - **embedding** - Photo indexing and similarity search service
//!
//! ## Usage in Handlers
//!
//! Services are accessed via `AppState`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let user = state.credentials.authenticate(&identifier, &password).await?;
//!     let token = state.tokens.issue(user.id)?;
//!     state.otp.issue_code(&user.username, &user.email).await?;
//! }
//! ```

mod credentials;
mod email;
mod embedding;
mod geocode;
mod otp;
mod tokens;

pub use credentials::{CredentialError, Credentials};
pub use email::{EmailSender, EmailSenderImpl};
pub use embedding::{EmbedRequest, EmbeddingClient, HttpEmbeddingClient, SearchResults};
pub use geocode::{NominatimGeocoder, ReverseGeocoder};
pub use otp::{OtpError, OtpManager};
pub use tokens::{JwtTokenService, TokenError, TokenService};

#[cfg(test)]
pub use email::MockEmailSender;
#[cfg(test)]
pub use embedding::MockEmbeddingClient;
#[cfg(test)]
pub use geocode::MockReverseGeocoder;
#[cfg(test)]
pub use tokens::MockTokenService;
