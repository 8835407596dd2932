use super::ValidationError;

const MAX_NAME_LENGTH: usize = 100;

/// Validates a team or organization name and returns it trimmed.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::NameEmpty);
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong);
    }

    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert_eq!(validate_name("Patent Squad").unwrap(), "Patent Squad");
        assert_eq!(validate_name("  R&D  ").unwrap(), "R&D");
        assert!(validate_name("Équipe Brevets").is_ok());
    }

    #[test]
    fn test_name_empty() {
        assert_eq!(validate_name("").unwrap_err(), ValidationError::NameEmpty);
        assert_eq!(validate_name("   ").unwrap_err(), ValidationError::NameEmpty);
    }

    #[test]
    fn test_name_too_long() {
        let long_name = "a".repeat(101);
        assert_eq!(validate_name(&long_name).unwrap_err(), ValidationError::NameTooLong);
        assert!(validate_name(&"é".repeat(100)).is_ok());
    }
}
