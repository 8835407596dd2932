pub mod email;
pub mod name;
pub mod slug;

pub use email::{normalize_domain, normalize_email, validate_email};
pub use name::validate_name;
pub use slug::slugify;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    EmailEmpty,
    EmailTooLong,
    EmailInvalidFormat,
    NameEmpty,
    NameTooLong,
    DomainInvalidFormat,
    DomainTaken,
    UnknownRole(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailEmpty => write!(f, "Email cannot be empty"),
            Self::EmailTooLong => write!(f, "Email is too long (max 254 characters)"),
            Self::EmailInvalidFormat => write!(f, "Invalid email format"),
            Self::NameEmpty => write!(f, "Name cannot be empty"),
            Self::NameTooLong => write!(f, "Name is too long (max 100 characters)"),
            Self::DomainInvalidFormat => write!(f, "Invalid email domain"),
            Self::DomainTaken => write!(f, "Email domain already belongs to an organization"),
            Self::UnknownRole(role) => write!(f, "Unknown role: {role}"),
        }
    }
}

impl std::error::Error for ValidationError {}
