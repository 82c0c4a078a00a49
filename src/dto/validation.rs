//! Validation helpers for registration and round-start DTOs.

use validator::ValidationError;

/// Maximum length of a nickname in characters.
const NICKNAME_MAX: usize = 24;
/// Maximum length of a profile name field in characters.
const NAME_MAX: usize = 40;
/// Maximum length of a victory chant in characters.
const CHANT_MAX: usize = 120;

/// Validates that a nickname is non-blank, short enough, and printable.
pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    let trimmed = nickname.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("nickname_blank");
        err.message = Some("Nickname must not be blank".into());
        return Err(err);
    }

    if trimmed.chars().count() > NICKNAME_MAX {
        let mut err = ValidationError::new("nickname_length");
        err.message = Some(format!("Nickname must be at most {NICKNAME_MAX} characters").into());
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("nickname_format");
        err.message = Some("Nickname must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a first/last profile name: non-blank and short enough.
pub fn validate_person_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Name must not be blank".into());
        return Err(err);
    }
    if trimmed.chars().count() > NAME_MAX {
        let mut err = ValidationError::new("name_length");
        err.message = Some(format!("Name must be at most {NAME_MAX} characters").into());
        return Err(err);
    }
    Ok(())
}

/// Validates an optional victory chant: short enough and printable.
pub fn validate_victory_chant(chant: &str) -> Result<(), ValidationError> {
    if chant.chars().count() > CHANT_MAX {
        let mut err = ValidationError::new("chant_length");
        err.message =
            Some(format!("Victory chant must be at most {CHANT_MAX} characters").into());
        return Err(err);
    }
    if chant.chars().any(char::is_control) {
        let mut err = ValidationError::new("chant_format");
        err.message = Some("Victory chant must not contain control characters".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nickname_accepts_reasonable_values() {
        assert!(validate_nickname("speedy").is_ok());
        assert!(validate_nickname("  padded  ").is_ok());
        assert!(validate_nickname("Émilie").is_ok());
    }

    #[test]
    fn nickname_rejects_blank_and_oversized() {
        assert!(validate_nickname("").is_err());
        assert!(validate_nickname("   ").is_err());
        assert!(validate_nickname(&"x".repeat(25)).is_err());
        assert!(validate_nickname("tab\there").is_err());
    }

    #[test]
    fn chant_is_optional_but_bounded() {
        assert!(validate_victory_chant("").is_ok());
        assert!(validate_victory_chant("first!").is_ok());
        assert!(validate_victory_chant(&"y".repeat(121)).is_err());
    }
}
