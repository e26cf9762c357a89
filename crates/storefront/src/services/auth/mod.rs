//! Authentication service.
//!
//! Email and password accounts with Argon2id hashes. The signed-in user is
//! kept in the session by [`crate::middleware::auth`].

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;

use shopfront_core::{Email, UserId, UserRole, ValidationErrors};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{ProfileUpdate, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Registration form.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterInput {
    fn validate(&self) -> Result<Email, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.length(&self.name, "name", 1, 100, "Name is required");
        let email = Email::parse(&self.email);
        errors.check(email.is_err(), "email", "Invalid email");
        if let Err(message) = validate_password(&self.password) {
            errors.add("password", message);
        }
        errors.finish()?;
        email.map_err(|_| ValidationErrors::single("email", "Invalid email"))
    }
}

/// Login form.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Authentication service.
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

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the name, email, or password is invalid.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, input: &RegisterInput) -> Result<User, AuthError> {
        let email = input.validate()?;
        self.create_user(&email, input.name.trim(), &input.password, UserRole::User)
            .await
    }

    /// Create an account with the given role. Used by registration and the CLI.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    /// Returns `AuthError::PasswordHash` if hashing fails.
    pub async fn create_user(
        &self,
        email: &Email,
        name: &str,
        password: &str,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let password_hash = hash_password(password)?;

        self.users
            .create(email, name, &password_hash, role)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, input: &LoginInput) -> Result<User, AuthError> {
        let mut errors = ValidationErrors::new();
        errors.require(&input.password, "password", "Password is required");
        errors.finish()?;

        // A malformed email cannot belong to an account.
        let email = Email::parse(&input.email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&input.password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for invalid fields.
    /// Returns `AuthError::UserAlreadyExists` if the new email is taken.
    /// Returns `AuthError::UserNotFound` if the account was deleted.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        let profile = update.validate()?;

        self.users
            .update_profile(user_id, &profile)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Give an existing account the admin role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has this email.
    pub async fn promote_to_admin(&self, email: &Email) -> Result<User, AuthError> {
        self.users
            .set_role(email, UserRole::Admin)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns the user-facing message when the password is too short.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }

    Ok(())
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
