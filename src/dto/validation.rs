//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::code::{CODE_ALPHABET, CODE_LENGTH};

/// Longest accepted display name, in characters.
const NAME_MAX_CHARS: usize = 32;
/// Longest accepted quiz or question identifier, in characters.
const IDENTIFIER_MAX_CHARS: usize = 64;

/// Validates that a room code is exactly [`CODE_LENGTH`] uppercase hexadecimal
/// characters.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("AB12CD") // Ok
/// validate_room_code("ab12cd") // Err - lowercase
/// validate_room_code("AB12C")  // Err - too short
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != CODE_LENGTH {
        let mut err = ValidationError::new("room_code_length");
        err.message =
            Some(format!("Room code must be exactly {CODE_LENGTH} characters (got {})", code.len()).into());
        return Err(err);
    }

    if !code.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only uppercase hexadecimal characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a display name is non-blank, printable, and at most
/// [`NAME_MAX_CHARS`] characters.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Display name must not be blank".into());
        return Err(err);
    }

    let chars = name.chars().count();
    if chars > NAME_MAX_CHARS {
        let mut err = ValidationError::new("name_length");
        err.message =
            Some(format!("Display name must be at most {NAME_MAX_CHARS} characters (got {chars})").into());
        return Err(err);
    }

    if name.chars().any(char::is_control) {
        let mut err = ValidationError::new("name_format");
        err.message = Some("Display name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a quiz or question identifier is non-empty, printable, and
/// at most [`IDENTIFIER_MAX_CHARS`] characters.
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        let mut err = ValidationError::new("identifier_empty");
        err.message = Some("Identifier must not be empty".into());
        return Err(err);
    }

    let chars = id.chars().count();
    if chars > IDENTIFIER_MAX_CHARS {
        let mut err = ValidationError::new("identifier_length");
        err.message = Some(
            format!("Identifier must be at most {IDENTIFIER_MAX_CHARS} characters (got {chars})")
                .into(),
        );
        return Err(err);
    }

    if id.chars().any(char::is_control) {
        let mut err = ValidationError::new("identifier_format");
        err.message = Some("Identifier must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_room_code_valid() {
        assert!(validate_room_code("AB12CD").is_ok());
        assert!(validate_room_code("000000").is_ok());
        assert!(validate_room_code("FFFFFF").is_ok());
    }

    #[test]
    fn test_validate_room_code_invalid_length() {
        assert!(validate_room_code("AB12C").is_err()); // too short
        assert!(validate_room_code("AB12CD0").is_err()); // too long
        assert!(validate_room_code("").is_err()); // empty
    }

    #[test]
    fn test_validate_room_code_invalid_format() {
        assert!(validate_room_code("ab12cd").is_err()); // lowercase
        assert!(validate_room_code("AB12CG").is_err()); // invalid hex
        assert!(validate_room_code("AB 2CD").is_err()); // space
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Alice").is_ok());
        assert!(validate_display_name("Player").is_ok());
        assert!(validate_display_name("").is_err()); // empty
        assert!(validate_display_name("   ").is_err()); // blank
        assert!(validate_display_name(&"x".repeat(33)).is_err()); // too long
        assert!(validate_display_name("Al\nce").is_err()); // control character
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("Q1").is_ok());
        assert!(validate_identifier("question-12").is_ok());
        assert!(validate_identifier("").is_err()); // empty
        assert!(validate_identifier(&"x".repeat(65)).is_err()); // too long
        assert!(validate_identifier("q\t1").is_err()); // control character
    }
}
