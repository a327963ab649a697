//! User service
//!
//! Registration and credential checking. Passwords are hashed with
//! [`crate::services::password`] before they reach the repository and are
//! never logged.

use crate::config::PasswordConfig;
use crate::db::is_unique_violation;
use crate::db::repositories::UserRepository;
use crate::forms::{Credentials, Registration};
use crate::models::User;
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Another account already uses this username
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    /// No account with this username
    #[error("User not found")]
    UnknownUser,

    /// Account exists but the password does not match
    #[error("Wrong password")]
    WrongPassword,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for registration and login
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    password: PasswordConfig,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, password: PasswordConfig) -> Self {
        Self {
            user_repo,
            password,
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - `UsernameTaken` if the username exists, including when a concurrent
    ///   registration wins the race and the insert hits the UNIQUE constraint
    /// - `InternalError` for hashing or database errors
    pub async fn register(&self, registration: &Registration) -> Result<User, UserServiceError> {
        let taken = self
            .user_repo
            .find_by_username(&registration.username)
            .await
            .context("Failed to check username")?
            .is_some();
        if taken {
            return Err(UserServiceError::UsernameTaken(registration.username.clone()));
        }

        let password_hash = hash_password(&registration.password, &self.password)
            .context("Failed to hash password")?;

        let id = match self
            .user_repo
            .insert(
                &registration.name,
                &registration.username,
                &registration.email,
                &password_hash,
            )
            .await
        {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => {
                return Err(UserServiceError::UsernameTaken(registration.username.clone()));
            }
            Err(e) => return Err(e.context("Failed to create user").into()),
        };

        tracing::info!("Registered user '{}' (id {})", registration.username, id);

        Ok(User {
            id,
            name: registration.name.clone(),
            username: registration.username.clone(),
            email: registration.email.clone(),
            password_hash,
            created_at: Utc::now(),
        })
    }

    /// Check a username and password, returning the account on success.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<User, UserServiceError> {
        let user = self
            .user_repo
            .find_by_username(&credentials.username)
            .await
            .context("Failed to get user by username")?
            .ok_or_else(|| {
                tracing::warn!("Login failed: unknown user '{}'", credentials.username);
                UserServiceError::UnknownUser
            })?;

        let valid = verify_password(&credentials.password, &user.password_hash)
            .context("Failed to verify password")?;

        if !valid {
            tracing::warn!("Login failed: wrong password for '{}'", credentials.username);
            return Err(UserServiceError::WrongPassword);
        }

        Ok(user)
    }
}
