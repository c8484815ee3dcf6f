//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{CreateUser, UpdateUser, User, UserClaims},
    repository::Repository,
};

use super::cascade::{CascadeCause, CascadeService, CascadeSummary};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    cascade: CascadeService,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, cascade: CascadeService, config: AuthConfig) -> Self {
        Self {
            repository,
            cascade,
            config,
        }
    }

    /// Authenticate by login and return a JWT token
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_login(login)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login or password".to_string()))?;

        if !user.is_active {
            return Err(AppError::Authentication("Account is deactivated".to_string()));
        }

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.login.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok((token, user))
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        if let Some(ref hash) = user.password {
            let parsed_hash = PasswordHash::new(hash)
                .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
            return Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok());
        }
        Ok(false)
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// List all users
    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    /// Create a new user
    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        if self.repository.users.login_exists(&user.login, None).await? {
            return Err(AppError::Conflict("Login already exists".to_string()));
        }

        let password = if let Some(ref password) = user.password {
            Some(self.hash_password(password)?)
        } else {
            None
        };

        self.repository.users.create(&user, password).await
    }

    /// Update an existing user
    pub async fn update_user(&self, id: i32, user: UpdateUser) -> AppResult<User> {
        self.repository.users.get_by_id(id).await?;

        if let Some(ref login) = user.login {
            if self.repository.users.login_exists(login, Some(id)).await? {
                return Err(AppError::Conflict("Login already exists".to_string()));
            }
        }

        let password = if let Some(ref password) = user.password {
            Some(self.hash_password(password)?)
        } else {
            None
        };

        self.repository.users.update(id, &user, password).await
    }

    /// Delete a user: cancels their open reservations first (releasing any
    /// held inventory), then removes the row. The ledger keeps the
    /// reservation history with a NULL user reference.
    pub async fn delete_user(&self, id: i32) -> AppResult<CascadeSummary> {
        self.repository.users.get_by_id(id).await?;

        let summary = self
            .cascade
            .cancel_user_reservations(id, CascadeCause::UserDeleted)
            .await?;
        self.repository.users.delete(id).await?;
        Ok(summary)
    }

    /// Deactivate a user: cancels pending and approved reservations but
    /// leaves active rentals (gear is out and still has to come back).
    pub async fn deactivate_user(&self, id: i32) -> AppResult<CascadeSummary> {
        self.repository.users.get_by_id(id).await?;

        let summary = self
            .cascade
            .cancel_user_reservations(id, CascadeCause::UserDeactivated)
            .await?;
        self.repository.users.set_active(id, false).await?;
        Ok(summary)
    }
}
