use crate::application_port::{AuthError, require_authenticated, require_ownership};
use crate::domain_model::{AuthenticatedUser, UserId};

/// Per-request state threaded explicitly through handlers and services.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub current_user: Option<AuthenticatedUser>,
    pub bearer_token: Option<String>,
}

impl RequestContext {
    pub fn anonymous(trace_id: impl Into<String>) -> Self {
        RequestContext {
            trace_id: trace_id.into(),
            current_user: None,
            bearer_token: None,
        }
    }

    pub fn current_user(&self) -> Option<&AuthenticatedUser> {
        self.current_user.as_ref()
    }

    pub fn require_authenticated(&self) -> Result<&AuthenticatedUser, AuthError> {
        require_authenticated(self.current_user())
    }

    pub fn require_ownership(&self, owner: UserId) -> Result<&AuthenticatedUser, AuthError> {
        require_ownership(self.current_user(), owner)
    }
}
