//! Authentication service.
//!
//! Email/password accounts with Argon2id hashes. The session layer stores the
//! resulting identity; this module only proves who the caller is.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use tracing::instrument;

use dryfruit_core::{ActivityKind, Email, Role, UserId};

use super::activity;
use crate::db::users::UserRepository;
use crate::db::{PgStore, RepositoryError};
use crate::models::{NewActivity, NewUser, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Authentication service.
///
/// Handles registration, login, and password management.
pub struct AuthService<'a> {
    store: &'a PgStore,
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(store: &'a PgStore) -> Self {
        Self {
            store,
            users: UserRepository::new(store.pool()),
        }
    }

    /// Register a new shopper account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if a name is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        let first_name = required(&registration.first_name, "First name")?;
        let last_name = required(&registration.last_name, "Last name")?;
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;
        let password_hash = hash_password(&registration.password)?;

        let user = self
            .create_user(NewUser {
                email,
                password_hash,
                first_name,
                last_name,
                phone: registration
                    .phone
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_owned),
                role: Role::User,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        activity::record(
            self.store,
            NewActivity::new(
                ActivityKind::Signup,
                user.id,
                format!("{} signed up", user.full_name()),
            ),
        )
        .await;

        Ok(user)
    }

    /// Create an account with an explicit role, for provisioning staff.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`], without the activity entry.
    pub async fn provision(
        &self,
        registration: &Registration,
        role: Role,
    ) -> Result<User, AuthError> {
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;
        self.create_user(NewUser {
            email,
            password_hash: hash_password(&registration.password)?,
            first_name: required(&registration.first_name, "First name")?,
            last_name: registration.last_name.trim().to_owned(),
            phone: registration.phone.clone(),
            role,
        })
        .await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AuthError> {
        self.users.create(&user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        activity::record(
            self.store,
            NewActivity::new(
                ActivityKind::Login,
                user.id,
                format!("{} logged in", user.full_name()),
            ),
        )
        .await;

        Ok(user)
    }

    /// Replace the password after verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong.
    /// Returns `AuthError::WeakPassword` if `new` doesn't meet requirements.
    /// Returns `AuthError::UserNotFound` if the account is gone.
    #[instrument(skip(self, current, new))]
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let hash = self
            .users
            .get_password_hash(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        verify_password(current, &hash)?;
        validate_password(new)?;

        self.users
            .set_password_hash(user_id, &hash_password(new)?)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Delete the account along with its cart, favorites, and orders.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete_account(&self, user_id: UserId) -> Result<(), AuthError> {
        if self.users.delete(user_id).await? {
            tracing::info!("Account deleted");
            Ok(())
        } else {
            Err(AuthError::UserNotFound)
        }
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
}

fn required(value: &str, label: &str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::MissingField(format!("{label} is required")));
    }
    Ok(value.to_owned())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
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
