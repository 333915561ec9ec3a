use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::error::UserResult;
use crate::models::{CreateUser, User};

/// Data access for users.
///
/// Implementations return stored records; projection to the public views
/// happens in the service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a validated user and return the id the store assigned
    async fn insert(&self, input: &CreateUser) -> UserResult<ObjectId>;

    async fn find_by_id(&self, id: ObjectId) -> UserResult<Option<User>>;

    /// Every stored user, in natural order
    async fn list(&self) -> UserResult<Vec<User>>;

    /// Users whose email or username equals `search` exactly
    async fn find_by_email_or_username(&self, search: &str) -> UserResult<Vec<User>>;

    async fn find_by_email(&self, email: &str) -> UserResult<Vec<User>>;

    /// Delete at most one user with this email, returning the deleted count
    async fn delete_by_email(&self, email: &str) -> UserResult<u64>;
}
