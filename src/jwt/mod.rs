//! Session tokens carrying a principal's role facts.
//!
//! The route gate reads onboarding status and org role straight from the
//! token, so it never touches storage. Guards never trust these claims.
//! Enable with the `jwt` feature flag.
//!
//! # Example
//!
//! ```ignore
//! use tenantry::jwt::{JwtConfig, JwtService};
//!
//! let config = JwtConfig::new("a-secret-of-at-least-thirty-two-bytes")?
//!     .with_expiry(chrono::Duration::hours(1))
//!     .with_issuer("tenantry");
//! let service = JwtService::new(config);
//!
//! let facts = cache.get(user_id).await?;
//! let token = service.issue(user_id, &facts)?;
//! let claims = service.decode(&token)?;
//! ```

mod claims;
mod config;
mod service;

pub use claims::SessionClaims;
pub use config::{JwtConfig, MIN_SECRET_LENGTH};
pub use service::JwtService;
