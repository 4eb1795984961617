//! User service
//!
//! Account management and token authentication:
//! - registration with email normalization and password length checks
//! - superuser creation for the CLI
//! - token issue (get-or-create) and token lookup
//! - profile updates for the authenticated user

use crate::db::repositories::{is_unique_violation, TokenRepository, UserRepository};
use crate::models::{normalize_email, AuthToken, CreateUserInput, UpdateUserInput, User};
use crate::services::password::{hash_password, verify_password};
use crate::services::validation::{
    check_max_length, required_text, FieldErrors, BLANK, NON_FIELD_ERRORS, REQUIRED,
};
use chrono::Utc;
use std::sync::Arc;

/// Default minimum password length
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 5;

const MAX_FIELD_LENGTH: usize = 255;

const EMAIL_TAKEN: &str = "user with this email already exists.";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid input, keyed by field
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    /// Token presented in a request is unknown
    #[error("Invalid token.")]
    InvalidToken,

    /// Token belongs to a deactivated account
    #[error("User inactive or deleted.")]
    InactiveUser,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<FieldErrors> for UserServiceError {
    fn from(errors: FieldErrors) -> Self {
        Self::ValidationError(errors)
    }
}

/// User service for managing accounts and tokens
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    token_repo: Arc<dyn TokenRepository>,
    min_password_length: usize,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, token_repo: Arc<dyn TokenRepository>) -> Self {
        Self {
            user_repo,
            token_repo,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }

    /// Override the minimum password length (from `auth.min_password_length`)
    pub fn with_min_password_length(mut self, min_password_length: usize) -> Self {
        self.min_password_length = min_password_length;
        self
    }

    /// Register a regular user.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the email is missing, malformed or taken, or
    ///   the password is missing or too short. Nothing is stored in that case.
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let user = self.build_user(input).await?;
        let created = self.user_repo.create(&user).await.map_err(email_conflict)?;

        tracing::info!(user_id = created.id, "Created user");
        Ok(created)
    }

    /// Register a user with staff and superuser flags set
    pub async fn create_superuser(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let user = self.build_user(input).await?.into_superuser();
        let created = self.user_repo.create(&user).await.map_err(email_conflict)?;

        tracing::info!(user_id = created.id, "Created superuser");
        Ok(created)
    }

    /// Exchange credentials for the user's API token.
    ///
    /// The same token is returned on every call until it is deleted.
    pub async fn obtain_token(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<AuthToken, UserServiceError> {
        let mut errors = FieldErrors::new();
        let email = required_text(&mut errors, "email", email);
        let password = match password {
            Some(p) if !p.is_empty() => Some(p),
            Some(_) => {
                errors.add("password", BLANK);
                None
            }
            None => {
                errors.add("password", REQUIRED);
                None
            }
        };
        errors.into_result()?;

        let (Some(email), Some(password)) = (email, password) else {
            return Err(FieldErrors::single(NON_FIELD_ERRORS, REQUIRED).into());
        };

        let invalid = || {
            UserServiceError::ValidationError(FieldErrors::single(
                NON_FIELD_ERRORS,
                "Unable to authenticate with provided credentials.",
            ))
        };

        let user = self
            .user_repo
            .get_by_email(&normalize_email(&email))
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? || !user.is_active {
            tracing::debug!(user_id = user.id, "Rejected token request");
            return Err(invalid());
        }

        let token = match self.token_repo.get_by_user(user.id).await? {
            Some(token) => token,
            None => self.token_repo.create(&AuthToken::generate(user.id)).await?,
        };
        self.user_repo.touch_last_login(user.id, Utc::now()).await?;

        Ok(token)
    }

    /// Resolve the user behind a token key
    pub async fn authenticate_token(&self, key: &str) -> Result<User, UserServiceError> {
        let token = self
            .token_repo
            .get_by_key(key)
            .await?
            .ok_or(UserServiceError::InvalidToken)?;

        let user = self
            .user_repo
            .get_by_id(token.user_id)
            .await?
            .ok_or(UserServiceError::InvalidToken)?;

        if !user.is_active {
            return Err(UserServiceError::InactiveUser);
        }
        Ok(user)
    }

    /// Update the authenticated user's own account.
    ///
    /// With `partial == false` every field must be supplied (PUT semantics);
    /// otherwise only the supplied fields change.
    pub async fn update_profile(
        &self,
        user: &User,
        input: UpdateUserInput,
        partial: bool,
    ) -> Result<User, UserServiceError> {
        let mut errors = FieldErrors::new();
        let mut updated = user.clone();

        if input.email.is_some() || !partial {
            if let Some(email) = required_text(&mut errors, "email", input.email.as_deref()) {
                let email = normalize_email(&email);
                if self.validate_email(&mut errors, &email, Some(user.id)).await? {
                    updated.email = email;
                }
            }
        }

        if input.name.is_some() || !partial {
            match input.name {
                Some(name) => {
                    let name = name.trim().to_string();
                    check_max_length(&mut errors, "name", &name, MAX_FIELD_LENGTH);
                    updated.name = name;
                }
                None => errors.add("name", REQUIRED),
            }
        }

        if input.password.is_some() || !partial {
            if let Some(password) = self.validate_password(&mut errors, input.password.as_deref()) {
                updated.password_hash = hash_password(password)?;
            }
        }

        errors.into_result()?;
        Ok(self.user_repo.update(&updated).await.map_err(email_conflict)?)
    }

    /// Validate a registration payload and hash its password
    async fn build_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let mut errors = FieldErrors::new();

        let email = match required_text(&mut errors, "email", input.email.as_deref()) {
            Some(email) => {
                let email = normalize_email(&email);
                self.validate_email(&mut errors, &email, None).await?;
                Some(email)
            }
            None => None,
        };

        let password = self.validate_password(&mut errors, input.password.as_deref());

        let name = input.name.map(|n| n.trim().to_string()).unwrap_or_default();
        check_max_length(&mut errors, "name", &name, MAX_FIELD_LENGTH);

        errors.into_result()?;

        match (email, password) {
            (Some(email), Some(password)) => Ok(User::new(&email, name, hash_password(password)?)),
            _ => Err(FieldErrors::single(NON_FIELD_ERRORS, REQUIRED).into()),
        }
    }

    /// Check format and uniqueness. Returns whether the email is acceptable.
    async fn validate_email(
        &self,
        errors: &mut FieldErrors,
        email: &str,
        current_user: Option<i64>,
    ) -> Result<bool, UserServiceError> {
        if !is_valid_email(email) {
            errors.add("email", "Enter a valid email address.");
            return Ok(false);
        }
        check_max_length(errors, "email", email, MAX_FIELD_LENGTH);

        if let Some(existing) = self.user_repo.get_by_email(email).await? {
            if Some(existing.id) != current_user {
                errors.add("email", EMAIL_TAKEN);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn validate_password<'a>(&self, errors: &mut FieldErrors, password: Option<&'a str>) -> Option<&'a str> {
        match password {
            None => {
                errors.add("password", REQUIRED);
                None
            }
            Some(p) if p.chars().count() < self.min_password_length => {
                errors.add(
                    "password",
                    format!("Ensure this field has at least {} characters.", self.min_password_length),
                );
                None
            }
            Some(p) => Some(p),
        }
    }
}

/// Loose shape check: one `@`, non-empty local part, dotted or `localhost`
/// domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && (domain == "localhost"
                    || (domain.contains('.')
                        && !domain.starts_with('.')
                        && !domain.ends_with('.')))
        }
        None => false,
    }
}

/// A duplicate email that slipped past the lookup (a concurrent
/// registration) is still a field error, not a server error
fn email_conflict(err: anyhow::Error) -> UserServiceError {
    if is_unique_violation(&err) {
        FieldErrors::single("email", EMAIL_TAKEN).into()
    } else {
        err.into()
    }
}
