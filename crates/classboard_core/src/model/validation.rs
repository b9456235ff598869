//! Field validation rules shared by entity types.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Minimum plaintext password length accepted before hashing.
pub const MIN_PASSWORD_CHARS: usize = 6;
pub const SCORE_MIN: i64 = 0;
pub const SCORE_MAX: i64 = 100;

/// Pass/fail validation outcome with a caller-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is missing or blank.
    Required { field: &'static str, label: &'static str },
    /// Email has no `@`.
    InvalidEmail,
    /// Plaintext password shorter than `MIN_PASSWORD_CHARS`.
    PasswordTooShort { min: usize },
    /// Coordinate is NaN or infinite.
    NotFinite { field: &'static str },
    /// Student score outside `SCORE_MIN..=SCORE_MAX`.
    ScoreOutOfRange { value: i64 },
}

impl ValidationError {
    /// Attribute the failure refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field, .. } => field,
            Self::InvalidEmail => "email",
            Self::PasswordTooShort { .. } => "password",
            Self::NotFinite { field } => field,
            Self::ScoreOutOfRange { .. } => "score",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required { label, .. } => write!(f, "{label} is required"),
            Self::InvalidEmail => write!(f, "Invalid email format"),
            Self::PasswordTooShort { min } => {
                write!(f, "Password must be at least {min} characters")
            }
            Self::NotFinite { field } => write!(f, "{field} must be a finite number"),
            Self::ScoreOutOfRange { .. } => {
                write!(f, "Score must be between {SCORE_MIN} and {SCORE_MAX}")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(
    field: &'static str,
    label: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field, label });
    }
    Ok(())
}

pub(crate) fn require_email(value: &str) -> Result<(), ValidationError> {
    require_text("email", "Email", value)?;
    if !value.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub(crate) fn require_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    Ok(())
}

pub(crate) fn require_score(value: i64) -> Result<(), ValidationError> {
    if !(SCORE_MIN..=SCORE_MAX).contains(&value) {
        return Err(ValidationError::ScoreOutOfRange { value });
    }
    Ok(())
}
