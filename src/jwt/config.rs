use chrono::Duration;
use std::fmt;

use crate::AccessError;

/// Shortest HS256 key accepted for session tokens, in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Settings for the session token that carries a principal's role facts
/// to the route gate.
///
/// The facts inside a token go stale when memberships change, so keep
/// `expiry` short and re-issue through `/session/refresh`.
#[derive(Clone)]
pub struct JwtConfig {
    /// Shared key for signing and verifying session tokens.
    pub(crate) secret: String,
    /// How long an issued session stays valid. Default: 1 hour.
    pub(crate) expiry: Duration,
    /// Written to `iss` and required on decode when set.
    pub(crate) issuer: Option<String>,
    /// Written to `aud` and required on decode when set.
    pub(crate) audience: Option<String>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl JwtConfig {
    /// Session token settings keyed by `secret`, with a one hour lifetime
    /// and no issuer or audience checks.
    ///
    /// # Errors
    /// `AccessError::ConfigurationError` when `secret` is shorter than
    /// [`MIN_SECRET_LENGTH`] bytes.
    pub fn new(secret: impl Into<String>) -> Result<Self, AccessError> {
        let secret = secret.into();

        if secret.len() < MIN_SECRET_LENGTH {
            return Err(AccessError::ConfigurationError(format!(
                "session token secret must be at least {MIN_SECRET_LENGTH} bytes, got {}",
                secret.len()
            )));
        }

        Ok(Self {
            secret,
            expiry: Duration::hours(1),
            issuer: None,
            audience: None,
        })
    }

    /// Lifetime of tokens issued from now on.
    #[must_use]
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }
}
