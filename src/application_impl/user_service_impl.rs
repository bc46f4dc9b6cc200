use super::auth_service_impl::{normalize_email, validate_email, validate_name, validate_password};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;
use tracing::info;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
}

impl RealUserService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
    ) -> RealUserService {
        RealUserService {
            user_repo,
            credential_hasher,
        }
    }

    fn normalize_changes(changes: UserChanges) -> Result<UserChanges, AuthError> {
        let name = changes.name.map(|name| name.trim().to_string());
        let email = changes.email.map(|email| normalize_email(&email));
        if let Some(name) = &name {
            validate_name(name)?;
        }
        if let Some(email) = &email {
            validate_email(email)?;
        }
        Ok(UserChanges { name, email })
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn list_users(&self) -> Result<Vec<UserProfile>, AuthError> {
        let users = self.user_repo.list().await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>, AuthError> {
        let user = self.user_repo.find_by_id(user_id).await?;
        Ok(user.map(UserProfile::from))
    }

    async fn me(&self, ctx: &RequestContext) -> Result<UserProfile, AuthError> {
        let current = ctx.require_authenticated()?;
        self.user_repo
            .find_by_id(current.id)
            .await?
            .map(UserProfile::from)
            .ok_or(AuthError::UserNotFound)
    }

    async fn create_user(
        &self,
        ctx: &RequestContext,
        request: RegisterInput,
    ) -> Result<UserProfile, AuthError> {
        let current = ctx.require_authenticated()?;

        let RegisterInput {
            name,
            email,
            password,
        } = request;
        let name = name.trim().to_string();
        let email = normalize_email(&email);
        validate_name(&name)?;
        validate_email(&email)?;
        validate_password(&password)?;

        if self.user_repo.exists(&email).await? {
            return Err(AuthError::UserExists);
        }
        let password_hash = self.credential_hasher.hash_password(&password).await?;
        let user = self
            .user_repo
            .create(NewUser {
                name,
                email,
                password_hash,
            })
            .await?;

        info!(trace_id = %ctx.trace_id, created_by = %current.id, user_id = %user.id, "user created");
        Ok(user.into())
    }

    async fn update_user(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        changes: UserChanges,
    ) -> Result<UserProfile, AuthError> {
        ctx.require_ownership(user_id)?;
        let changes = Self::normalize_changes(changes)?;

        let user = self
            .user_repo
            .update(user_id, changes)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(trace_id = %ctx.trace_id, %user_id, "user updated");
        Ok(user.into())
    }

    async fn delete_user(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<UserProfile, AuthError> {
        ctx.require_ownership(user_id)?;

        let user = self
            .user_repo
            .delete(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(trace_id = %ctx.trace_id, %user_id, "user deleted");
        Ok(user.into())
    }
}
