use regex::Regex;
use std::sync::LazyLock;

use super::ValidationError;

#[allow(clippy::expect_used)]
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

#[allow(clippy::expect_used)]
static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,}$").expect("domain pattern is valid")
});

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailEmpty);
    }

    if email.len() > 254 {
        return Err(ValidationError::EmailTooLong);
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(())
}

/// Trims and lowercases an address, then validates it.
///
/// Invite emails and provisioned users are stored in this form so that
/// comparisons are case-insensitive.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let normalized = email.trim().to_lowercase();
    validate_email(&normalized)?;
    Ok(normalized)
}

/// Normalizes an organization's email domain (`Example.COM` -> `example.com`).
pub fn normalize_domain(domain: &str) -> Result<String, ValidationError> {
    let normalized = domain.trim().trim_start_matches('@').to_lowercase();
    if !DOMAIN_REGEX.is_match(&normalized) {
        return Err(ValidationError::DomainInvalidFormat);
    }
    Ok(normalized)
}
