use crate::application_port::{AuthError, RegisterInput, RequestContext};
use crate::domain_model::{UserChanges, UserId, UserProfile};

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserProfile>, AuthError>;
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>, AuthError>;
    async fn me(&self, ctx: &RequestContext) -> Result<UserProfile, AuthError>;
    async fn create_user(
        &self,
        ctx: &RequestContext,
        request: RegisterInput,
    ) -> Result<UserProfile, AuthError>;
    async fn update_user(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        changes: UserChanges,
    ) -> Result<UserProfile, AuthError>;
    async fn delete_user(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<UserProfile, AuthError>;
}
