//! User domain types and validation rules.
//!
//! Password strength rules follow the OWASP Authentication and Password
//! Storage cheat sheets.

use std::str::FromStr;

use gatehouse_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle state of a user account.
///
/// `Deleted` is a soft-delete marker: the row stays for referential
/// integrity, but the account is excluded from lookups and login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Account may authenticate and be acted upon.
    Active,
    /// Account was created without credentials and awaits activation.
    Pending,
    /// Account is archived.
    Deleted,
}

impl UserStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Deleted => "deleted",
        }
    }
}

impl FromStr for UserStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "pending" => Ok(Self::Pending),
            "deleted" => Ok(Self::Deleted),
            _ => Err(AppError::Validation(format!(
                "unknown user status '{value}'"
            ))),
        }
    }
}

/// Validated, canonicalized (trimmed, lowercased) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one
    /// `@`, local part and domain are non-empty, domain contains at least
    /// one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let parts: Vec<&str> = trimmed.splitn(2, '@').collect();
        if parts.len() != 2 {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Minimum password length (NIST SP800-63B).
pub const PASSWORD_MIN_LENGTH: usize = 10;

/// Maximum password length to allow passphrases while bounding Argon2id cost.
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Validates a plaintext password against OWASP and NIST rules.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    if is_common_password(password) {
        return Err(AppError::Validation(
            "this password is too common and has appeared in data breaches".to_owned(),
        ));
    }

    Ok(())
}

fn is_common_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS.iter().any(|entry| *entry == lowered)
}

/// Top breached passwords (subset for fast embedded check).
static COMMON_PASSWORDS: &[&str] = &[
    "password",
    "123456",
    "12345678",
    "1234567890",
    "qwerty",
    "abc123",
    "monkey",
    "master",
    "dragon",
    "111111",
    "iloveyou",
    "trustno1",
    "sunshine",
    "princess",
    "football",
    "superman",
    "qwerty123",
    "password1",
    "password123",
    "welcome",
    "admin",
    "letmein",
    "passw0rd",
    "qwertyuiop",
    "whatever",
    "1234567",
];
