//! User model
//!
//! Accounts are identified by email. The email is normalized on the way in
//! (domain part lower-cased) and the password is only ever stored as an
//! argon2 hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique, normalized)
    pub email: String,
    /// Display name
    pub name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Inactive accounts cannot obtain or use tokens
    pub is_active: bool,
    /// Staff accounts may manage the site
    pub is_staff: bool,
    /// Superusers hold every permission
    pub is_superuser: bool,
    /// Last successful token request
    pub last_login: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new regular user.
    ///
    /// The email is normalized here; the password must already be hashed
    /// (see `services::password::hash_password()`).
    pub fn new(email: &str, name: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            email: normalize_email(email),
            name,
            password_hash,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Promote to staff + superuser
    pub fn into_superuser(mut self) -> Self {
        self.is_staff = true;
        self.is_superuser = true;
        self
    }
}

/// Normalize an email address by lower-casing the domain part.
///
/// The local part is case-sensitive by RFC and kept as given.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Email address (required)
    pub email: Option<String>,
    /// Plaintext password (will be hashed)
    pub password: Option<String>,
    /// Display name
    pub name: Option<String>,
}

impl CreateUserInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Input for updating the authenticated user's profile
#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}
