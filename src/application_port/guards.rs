use crate::application_port::AuthError;
use crate::domain_model::{AuthenticatedUser, UserId};

pub fn require_authenticated(
    current_user: Option<&AuthenticatedUser>,
) -> Result<&AuthenticatedUser, AuthError> {
    current_user.ok_or(AuthError::Unauthenticated)
}

pub fn require_ownership(
    current_user: Option<&AuthenticatedUser>,
    resource_owner_id: UserId,
) -> Result<&AuthenticatedUser, AuthError> {
    let user = require_authenticated(current_user)?;
    if user.id != resource_owner_id {
        return Err(AuthError::Forbidden);
    }
    Ok(user)
}
