//! Authentication service.
//!
//! Registration with argon2 password hashing, login, and account activation.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use freshmall_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Allowed username length, in characters.
const USERNAME_LENGTH: std::ops::RangeInclusive<usize> = 5..=20;

/// Allowed password length, in characters.
const PASSWORD_LENGTH: std::ops::RangeInclusive<usize> = 8..=20;

// =============================================================================
// Forms
// =============================================================================

/// Registration form as posted by the browser.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub user_name: Option<String>,
    pub pwd: Option<String>,
    pub email: Option<String>,
    pub allow: Option<String>,
}

/// A registration that passed validation.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: Email,
}

impl RegisterForm {
    /// Validate the form, checking fields in the order the page reports them:
    /// completeness, e-mail shape, agreement, then lengths.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as an `AuthError`.
    pub fn validate(&self) -> Result<Registration, AuthError> {
        let (Some(username), Some(password), Some(email)) = (
            non_empty(self.user_name.as_deref()),
            non_empty(self.pwd.as_deref()),
            non_empty(self.email.as_deref()),
        ) else {
            return Err(AuthError::IncompleteData);
        };

        let email = Email::parse(email)?;

        if self.allow.as_deref() != Some("on") {
            return Err(AuthError::AgreementNotAccepted);
        }

        if !USERNAME_LENGTH.contains(&username.chars().count()) {
            return Err(AuthError::InvalidUsername);
        }

        if !PASSWORD_LENGTH.contains(&password.chars().count()) {
            return Err(AuthError::WeakPassword);
        }

        Ok(Registration {
            username: username.to_owned(),
            password: password.to_owned(),
            email,
        })
    }
}

/// Login form as posted by the browser.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub pwd: Option<String>,
    pub remember: Option<String>,
}

/// Login credentials that passed validation.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Whether to remember the username in a cookie.
    pub remember: bool,
}

impl LoginForm {
    /// Check that both username and password were supplied.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IncompleteData` if either is missing or empty.
    pub fn validate(&self) -> Result<Credentials, AuthError> {
        let (Some(username), Some(password)) = (
            non_empty(self.username.as_deref()),
            non_empty(self.pwd.as_deref()),
        ) else {
            return Err(AuthError::IncompleteData);
        };

        Ok(Credentials {
            username: username.to_owned(),
            password: password.to_owned(),
            remember: self.remember.as_deref() == Some("on"),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// Service
// =============================================================================

/// Authentication service.
///
/// Handles user registration, login and activation.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new, inactive user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the username is taken,
    /// including when a concurrent registration wins the race.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        if self.users.username_exists(&registration.username).await? {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(&registration.password)?;

        let user = self
            .users
            .create_inactive(&registration.username, &registration.email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with username and password.
    ///
    /// The activation flag is only checked once the password is verified, so
    /// "not activated" is never revealed for a wrong password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    /// Returns `AuthError::NotActivated` if the account is not yet active.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let (user, password_hash) = self
            .users
            .get_with_password_hash(&credentials.username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&credentials.password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::NotActivated);
        }

        Ok(user)
    }

    /// Activate the account behind a verified activation token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user no longer exists.
    #[instrument(skip(self))]
    pub async fn activate(&self, user_id: UserId) -> Result<(), AuthError> {
        if !self.users.activate(user_id).await? {
            return Err(AuthError::UserNotFound);
        }
        tracing::info!(%user_id, "User activated");
        Ok(())
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn register_form(user_name: &str, pwd: &str, email: &str, allow: &str) -> RegisterForm {
        let some = |s: &str| (!s.is_empty()).then(|| s.to_owned());
        RegisterForm {
            user_name: some(user_name),
            pwd: some(pwd),
            email: some(email),
            allow: some(allow),
        }
    }

    #[test]
    fn test_register_form_valid() {
        let reg = register_form("alice01", "s3cretpass", "alice@example.com", "on")
            .validate()
            .unwrap();
        assert_eq!(reg.username, "alice01");
        assert_eq!(reg.email.as_str(), "alice@example.com");
    }

    #[test]
    fn test_register_form_incomplete() {
        for form in [
            register_form("", "s3cretpass", "alice@example.com", "on"),
            register_form("alice01", "", "alice@example.com", "on"),
            register_form("alice01", "s3cretpass", "", "on"),
            RegisterForm::default(),
        ] {
            assert!(matches!(form.validate(), Err(AuthError::IncompleteData)));
        }
    }

    #[test]
    fn test_register_form_check_order() {
        // Bad e-mail is reported before the missing agreement.
        let err = register_form("alice01", "s3cretpass", "not-an-email", "")
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid email address");

        let err = register_form("alice01", "s3cretpass", "alice@example.com", "off")
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Please accept the user agreement");
    }

    #[test]
    fn test_register_form_lengths() {
        assert!(matches!(
            register_form("al", "s3cretpass", "alice@example.com", "on").validate(),
            Err(AuthError::InvalidUsername)
        ));
        assert!(matches!(
            register_form(&"a".repeat(21), "s3cretpass", "alice@example.com", "on").validate(),
            Err(AuthError::InvalidUsername)
        ));
        assert!(matches!(
            register_form("alice01", "short", "alice@example.com", "on").validate(),
            Err(AuthError::WeakPassword)
        ));
        assert!(matches!(
            register_form("alice01", &"p".repeat(21), "alice@example.com", "on").validate(),
            Err(AuthError::WeakPassword)
        ));
    }

    #[test]
    fn test_register_form_column_limits() {
        let reg = register_form(&"a".repeat(20), &"p".repeat(20), "alice@example.com", "on")
            .validate()
            .unwrap();
        assert_eq!(reg.username.len(), 20);

        let long_email = format!("{}@example.com", "a".repeat(250));
        let err = register_form("alice01", "s3cretpass", &long_email, "on")
            .validate()
            .unwrap_err();
        assert!(err.is_form_error());
        assert_eq!(err.to_string(), "Invalid email address");

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(matches!(
            register_form("alice01", "s3cretpass", &long_local, "on").validate(),
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_login_form() {
        let form = LoginForm {
            username: Some("alice01".to_string()),
            pwd: Some("s3cretpass".to_string()),
            remember: Some("on".to_string()),
        };
        let creds = form.validate().unwrap();
        assert!(creds.remember);

        let form = LoginForm {
            username: Some("alice01".to_string()),
            pwd: Some(String::new()),
            remember: None,
        };
        assert!(matches!(form.validate(), Err(AuthError::IncompleteData)));
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("s3cretpass").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("s3cretpass", &hash).is_ok());
        assert!(matches!(
            verify_password("wrongpass", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_form_errors_are_shown_inline() {
        assert!(AuthError::UserAlreadyExists.is_form_error());
        assert!(AuthError::NotActivated.is_form_error());
        assert!(!AuthError::PasswordHash.is_form_error());
    }
}
