//! Full-name handling for the eligible voter registry, plus the nickname rules shared by
//! submissions and conversations.
//!
//! Names are matched by their normalized form: trimmed, lowercased, with every run of internal
//! whitespace collapsed to a single space.

use thiserror::Error;

/// Names shorter than this (in characters, after trimming) are rejected.
pub const MIN_NAME_CHARS: usize = 5;

/// Names longer than this (in characters, after trimming) are rejected.
pub const MAX_NAME_CHARS: usize = 200;

/// Longest nickname accepted, in characters.
pub const MAX_NICKNAME_CHARS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name must be at least {MIN_NAME_CHARS} characters long")]
    TooShort,
    #[error("name must be at most {MAX_NAME_CHARS} characters long")]
    TooLong,
    #[error("name may only contain letters and spaces")]
    IllegalCharacter,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NicknameError {
    #[error("nickname must not be empty")]
    Empty,
    #[error("nickname must be at most {MAX_NICKNAME_CHARS} characters long")]
    TooLong,
}

/// Normalize a name for matching.
pub fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Check that a name is acceptable for the registry, returning it trimmed.
pub fn validate(name: &str) -> Result<&str, NameError> {
    let trimmed = name.trim();
    let length = trimmed.chars().count();
    if length < MIN_NAME_CHARS {
        return Err(NameError::TooShort);
    }
    if length > MAX_NAME_CHARS {
        return Err(NameError::TooLong);
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ')
    {
        return Err(NameError::IllegalCharacter);
    }
    Ok(trimmed)
}

/// Check a display nickname, returning it trimmed.
pub fn validate_nickname(nickname: &str) -> Result<&str, NicknameError> {
    let trimmed = nickname.trim();
    if trimmed.is_empty() {
        return Err(NicknameError::Empty);
    }
    if trimmed.chars().count() > MAX_NICKNAME_CHARS {
        return Err(NicknameError::TooLong);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_ignores_case_and_spacing() {
        let expected = "иванов иван иванович";
        assert_eq!(normalize("Иванов Иван Иванович"), expected);
        assert_eq!(normalize("ИВАНОВ ИВАН ИВАНОВИЧ"), expected);
        assert_eq!(normalize("  Иванов   Иван  Иванович  "), expected);
        assert_eq!(normalize("\tИванов\nИван Иванович"), expected);
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize("  Jane   DOE ");
        assert_eq!(normalize(&once), once);
        assert_eq!(once, "jane doe");
    }

    #[test]
    fn length_is_counted_in_characters() {
        // Five Cyrillic letters are ten bytes, but still only five characters.
        assert_eq!(validate("Анной"), Ok("Анной"));
        assert_eq!(validate("Анна"), Err(NameError::TooShort));
        assert_eq!(validate("   Anna   "), Err(NameError::TooShort));
        assert_eq!(validate(&"a".repeat(MAX_NAME_CHARS + 1)), Err(NameError::TooLong));
    }

    #[test]
    fn only_letters_and_spaces_are_allowed() {
        assert_eq!(validate("  Jane Doe "), Ok("Jane Doe"));
        assert_eq!(validate("Jane Doe 2nd"), Err(NameError::IllegalCharacter));
        assert_eq!(validate("Jane-Marie Doe"), Err(NameError::IllegalCharacter));
        assert_eq!(validate("Robert'); DROP"), Err(NameError::IllegalCharacter));
        assert_eq!(validate("Jane\tDoe"), Err(NameError::IllegalCharacter));
        assert_eq!(validate("Jane\nDoe"), Err(NameError::IllegalCharacter));
    }

    #[test]
    fn nickname_rules() {
        assert_eq!(validate_nickname("  nick "), Ok("nick"));
        assert_eq!(validate_nickname(" \t "), Err(NicknameError::Empty));
        let longest = "n".repeat(MAX_NICKNAME_CHARS);
        assert_eq!(validate_nickname(&longest), Ok(longest.as_str()));
        assert_eq!(
            validate_nickname(&"n".repeat(MAX_NICKNAME_CHARS + 1)),
            Err(NicknameError::TooLong)
        );
    }
}
