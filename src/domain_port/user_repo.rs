use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum UserRepoError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("store error: {0}")]
    Store(String),
}

/// Persistent user store.
///
/// `update` and `delete` report a missing row as `Ok(None)` so callers can
/// tell it apart from a storage failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserRepoError>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, UserRepoError>;

    async fn exists(&self, email: &str) -> Result<bool, UserRepoError>;

    /// Fails with `DuplicateEmail` when the store's uniqueness constraint trips.
    async fn create(&self, user: NewUser) -> Result<UserRecord, UserRepoError>;

    async fn list(&self) -> Result<Vec<UserRecord>, UserRepoError>;

    async fn update(
        &self,
        user_id: UserId,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, UserRepoError>;

    async fn delete(&self, user_id: UserId) -> Result<Option<UserRecord>, UserRepoError>;
}
