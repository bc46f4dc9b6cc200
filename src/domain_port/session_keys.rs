use crate::domain_model::UserId;
use sha2::{Digest, Sha256};

/// Key layout shared by every session cache backend:
/// `<prefix>:refresh:<user_id>` and `<prefix>:blacklist:<sha256 hex>`.
#[derive(Debug, Clone)]
pub struct SessionKeys {
    prefix: String,
}

impl SessionKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        SessionKeys {
            prefix: prefix.into(),
        }
    }

    pub fn refresh(&self, user_id: UserId) -> String {
        format!("{}:refresh:{}", self.prefix, user_id)
    }

    /// Blacklist entries are addressed by the token's digest so key length
    /// stays fixed whatever the token size.
    pub fn blacklist(&self, token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        format!("{}:blacklist:{}", self.prefix, hex::encode(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_key_is_per_user() {
        let keys = SessionKeys::new("auth");
        assert_eq!(keys.refresh(UserId(12)), "auth:refresh:12");
    }

    #[test]
    fn blacklist_key_has_fixed_length() {
        let keys = SessionKeys::new("auth");
        let short = keys.blacklist("a");
        let long = keys.blacklist(&"x".repeat(4096));

        assert!(short.starts_with("auth:blacklist:"));
        assert_eq!(short.len(), long.len());
        assert_ne!(short, long);
        assert_eq!(keys.blacklist("a"), short);
    }
}
