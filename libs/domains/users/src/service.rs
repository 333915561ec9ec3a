//! User Service - Business logic layer

use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::error::{UserError, UserResult};
use crate::models::{CreateUser, UserResponse, UserView};
use crate::repository::UserRepository;

/// Validation, creation read-back and projection over a [`UserRepository`]
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Validate and insert a user, then read the stored document back.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_user(&self, input: CreateUser) -> UserResult<UserView> {
        input.validate()?;

        let id = self.repository.insert(&input).await?;
        let created = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::CreationInconsistency)?;

        tracing::info!(user_id = %id, "User created successfully");
        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> UserResult<Vec<UserResponse>> {
        let users = self.repository.list().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// Users whose email or username equals `search`; none is [`UserError::NotFound`].
    #[instrument(skip(self))]
    pub async fn search_users(&self, search: &str) -> UserResult<Vec<UserResponse>> {
        let users = self.repository.find_by_email_or_username(search).await?;
        if users.is_empty() {
            return Err(UserError::NotFound);
        }
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// Delete one user by email, returning the confirmation message.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, email: &str) -> UserResult<String> {
        if self.repository.find_by_email(email).await?.is_empty() {
            return Err(UserError::NotFound);
        }

        let deleted = self.repository.delete_by_email(email).await?;
        if deleted == 0 {
            tracing::warn!(email, "User disappeared before it could be deleted");
        } else {
            tracing::info!(email, "User deleted successfully");
        }

        Ok(format!("User with email {} deleted successfully", email))
    }
}
