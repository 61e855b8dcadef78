//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during registration, login and activation.
///
/// The display text of the validation variants is shown to the user as-is.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required form field is missing or empty.
    #[error("Incomplete data")]
    IncompleteData,

    /// Invalid email format.
    #[error("Invalid email address")]
    InvalidEmail(#[from] freshmall_core::EmailError),

    /// The user agreement checkbox was not ticked.
    #[error("Please accept the user agreement")]
    AgreementNotAccepted,

    /// Username outside the allowed length.
    #[error("Username must be 5-20 characters")]
    InvalidUsername,

    /// Password outside the allowed length.
    #[error("Password must be 8-20 characters")]
    WeakPassword,

    /// Username already taken.
    #[error("Username already exists")]
    UserAlreadyExists,

    /// Invalid credentials (wrong password or user not found).
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// Correct credentials, but the e-mail link was never followed.
    #[error("Account not activated")]
    NotActivated,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Whether the error is caused by user input and should be shown inline
    /// on the form rather than treated as a server failure.
    #[must_use]
    pub const fn is_form_error(&self) -> bool {
        !matches!(
            self,
            Self::Repository(_) | Self::PasswordHash | Self::UserNotFound
        )
    }
}
