use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn validate_name(name: &str) -> Result<(), AuthError> {
    if name.trim().is_empty() {
        return Err(AuthError::BadInput("name must not be empty".to_string()));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), AuthError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AuthError::BadInput("email is not valid".to_string()));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::BadInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    session_cache: Arc<dyn SessionCache>,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        session_cache: Arc<dyn SessionCache>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_codec,
            session_cache,
        }
    }

    /// Time left until `expires_at` (unix seconds), zero if already past.
    fn remaining(expires_at: i64) -> Duration {
        let secs = expires_at - Utc::now().timestamp();
        Duration::from_secs(u64::try_from(secs).unwrap_or(0))
    }

    /// Issue a fresh access/refresh pair and make the refresh token the
    /// user's only valid one.
    async fn start_session(&self, user: &UserRecord) -> Result<AuthTokens, AuthError> {
        let subject = TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
        };
        let access = self.token_codec.issue(TokenKind::Access, &subject)?;
        let refresh = self.token_codec.issue(TokenKind::Refresh, &subject)?;

        let ttl = Self::remaining(refresh.payload.expires_at);
        self.session_cache
            .store_refresh_token(user.id, &refresh.token, ttl)
            .await?;

        Ok(AuthTokens {
            access_token_expires_at: access.expires_at(),
            refresh_token_expires_at: refresh.expires_at(),
            access_token: AccessToken(access.token),
            refresh_token: RefreshToken(refresh.token),
        })
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, request: RegisterInput) -> Result<AuthenticatedUser, AuthError> {
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
        // The store's unique constraint settles a race with a concurrent register.
        let user = self
            .user_repo
            .create(NewUser {
                name,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        Ok(AuthenticatedUser::from(&user))
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { email, password } = request;
        let email = normalize_email(&email);

        let Some(rec) = self.user_repo.find_by_email(&email).await? else {
            debug!("login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            debug!(user_id = %rec.id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.start_session(&rec).await?;

        info!(user_id = %rec.id, "user logged in");
        Ok(LoginResult {
            user: AuthenticatedUser::from(&rec),
            tokens,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let payload = self.token_codec.verify(TokenKind::Refresh, refresh_token)?;
        let user_id = payload.user_id;

        // Only the most recently issued refresh token is accepted.
        let stored = self.session_cache.get_refresh_token(user_id).await?;
        if stored.as_deref() != Some(refresh_token) {
            debug!(%user_id, "refresh rejected: token missing or superseded");
            return Err(AuthError::TokenInvalid);
        }

        let Some(rec) = self.user_repo.find_by_id(user_id).await? else {
            debug!(%user_id, "refresh rejected: user no longer exists");
            return Err(AuthError::TokenInvalid);
        };

        let tokens = self.start_session(&rec).await?;

        info!(%user_id, "tokens refreshed");
        Ok(tokens)
    }

    async fn logout(&self, user_id: UserId, access_token: &str) -> Result<(), AuthError> {
        let ceiling = self.token_codec.ttl(TokenKind::Access);
        let ttl = match self.token_codec.verify(TokenKind::Access, access_token) {
            Ok(payload) => Self::remaining(payload.expires_at).min(ceiling),
            Err(_) => ceiling,
        };

        // Both writes are attempted whatever happens to the other one.
        let removed = self.session_cache.remove_refresh_token(user_id).await;
        if let Err(e) = &removed {
            warn!(%user_id, error = %e, "logout: failed to remove refresh token");
        }
        let blacklisted = self.session_cache.blacklist_token(access_token, ttl).await;
        if let Err(e) = &blacklisted {
            warn!(%user_id, error = %e, "logout: failed to blacklist access token");
        }
        removed.and(blacklisted)?;

        info!(%user_id, "user logged out");
        Ok(())
    }

    async fn validate_access_token(&self, token: &str) -> Option<AuthenticatedUser> {
        let payload = self.token_codec.verify(TokenKind::Access, token).ok()?;
        let user_id = payload.user_id;

        match self.session_cache.is_blacklisted(token).await {
            Ok(false) => {}
            Ok(true) => {
                debug!(%user_id, "access token revoked");
                return None;
            }
            Err(e) => {
                warn!(%user_id, error = %e, "blacklist lookup failed");
                return None;
            }
        }

        match self.user_repo.find_by_id(user_id).await {
            Ok(Some(rec)) => Some(AuthenticatedUser::from(&rec)),
            Ok(None) => {
                debug!(%user_id, "access token for a deleted user");
                None
            }
            Err(e) => {
                warn!(%user_id, error = %e, "user lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{Argon2PasswordHasher, JwtConfig, JwtHs256Codec};
    use crate::infra_memory::{MemorySessionCache, MemoryUserRepo};
    use testresult::TestResult;

    const ACCESS_TTL: Duration = Duration::from_secs(15 * 60);

    struct Harness {
        service: RealAuthService,
        users: Arc<MemoryUserRepo>,
    }

    fn codec() -> Arc<dyn TokenCodec> {
        match JwtHs256Codec::new(JwtConfig {
            signing_key: b"auth-service-tests".to_vec(),
            access_ttl: ACCESS_TTL,
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }) {
            Ok(codec) => Arc::new(codec),
            Err(e) => panic!("codec config rejected: {e}"),
        }
    }

    fn hasher() -> Arc<dyn CredentialHasher> {
        match Argon2PasswordHasher::with_params(8, 1, 1) {
            Ok(hasher) => Arc::new(hasher),
            Err(e) => panic!("params rejected: {e}"),
        }
    }

    fn service_with_cache(
        users: Arc<MemoryUserRepo>,
        cache: Arc<dyn SessionCache>,
    ) -> RealAuthService {
        RealAuthService::new(users, hasher(), codec(), cache)
    }

    fn harness() -> Harness {
        let users = Arc::new(MemoryUserRepo::new());
        let cache = Arc::new(MemorySessionCache::new("test"));
        Harness {
            service: service_with_cache(users.clone(), cache),
            users,
        }
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            name: "A".to_string(),
            email: email.to_string(),
            password: "pw123456".to_string(),
        }
    }

    fn login_input(email: &str, password: &str) -> LoginInput {
        LoginInput {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_returns_public_projection() -> TestResult {
        let h = harness();

        let user = h.service.register(register_input(" A@X.com ")).await?;

        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.name, "A");
        let stored = h.users.find_by_id(user.id).await?;
        assert!(stored.is_some_and(|rec| rec.password_hash != "pw123456"));
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let h = harness();

        let mut blank_name = register_input("a@x.com");
        blank_name.name = "  ".to_string();
        let mut short_password = register_input("a@x.com");
        short_password.password = "pw1".to_string();

        for input in [register_input("not-an-email"), blank_name, short_password] {
            assert!(matches!(
                h.service.register(input).await,
                Err(AuthError::BadInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn second_register_with_same_email_conflicts() -> TestResult {
        let h = harness();
        let first = h.service.register(register_input("a@x.com")).await?;

        let mut again = register_input("a@x.com");
        again.name = "Impostor".to_string();
        again.password = "another-password".to_string();
        let result = h.service.register(again).await;

        assert!(matches!(result, Err(AuthError::UserExists)));
        let stored = h.users.find_by_id(first.id).await?;
        assert_eq!(stored.map(|rec| rec.name), Some("A".to_string()));
        assert!(
            h.service
                .login(login_input("a@x.com", "pw123456"))
                .await
                .is_ok()
        );
        Ok(())
    }

    #[tokio::test]
    async fn login_issues_distinct_verifiable_tokens() -> TestResult {
        let h = harness();
        let user = h.service.register(register_input("a@x.com")).await?;

        let result = h.service.login(login_input("a@x.com", "pw123456")).await?;
        let tokens = result.tokens;

        assert_eq!(result.user, user);
        assert!(!tokens.access_token.0.is_empty());
        assert!(!tokens.refresh_token.0.is_empty());
        assert_ne!(tokens.access_token.0, tokens.refresh_token.0);
        assert!(tokens.access_token_expires_at < tokens.refresh_token_expires_at);
        assert_eq!(
            h.service.validate_access_token(&tokens.access_token.0).await,
            Some(user)
        );
        Ok(())
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() -> TestResult {
        let h = harness();
        h.service.register(register_input("a@x.com")).await?;

        let missing = h.service.login(login_input("missing@x.com", "anything")).await;
        let wrong = h.service.login(login_input("a@x.com", "wrong-password")).await;

        let (Err(missing), Err(wrong)) = (missing, wrong) else {
            panic!("both logins must fail");
        };
        assert!(matches!(missing, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(missing.to_string(), wrong.to_string());
        Ok(())
    }

    #[tokio::test]
    async fn logout_revokes_the_presented_access_token() -> TestResult {
        let h = harness();
        let user = h.service.register(register_input("a@x.com")).await?;
        let tokens = h
            .service
            .login(login_input("a@x.com", "pw123456"))
            .await?
            .tokens;
        let access = tokens.access_token.0;
        assert!(h.service.validate_access_token(&access).await.is_some());

        h.service.logout(user.id, &access).await?;

        assert_eq!(h.service.validate_access_token(&access).await, None);
        Ok(())
    }

    #[tokio::test]
    async fn logout_also_ends_the_refresh_session() -> TestResult {
        let h = harness();
        let user = h.service.register(register_input("a@x.com")).await?;
        let tokens = h
            .service
            .login(login_input("a@x.com", "pw123456"))
            .await?
            .tokens;

        h.service.logout(user.id, &tokens.access_token.0).await?;

        assert!(matches!(
            h.service.refresh(&tokens.refresh_token.0).await,
            Err(AuthError::TokenInvalid)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_token_is_single_use() -> TestResult {
        let h = harness();
        h.service.register(register_input("a@x.com")).await?;
        let original = h
            .service
            .login(login_input("a@x.com", "pw123456"))
            .await?
            .tokens
            .refresh_token
            .0;

        let rotated = h.service.refresh(&original).await?;

        assert_ne!(rotated.refresh_token.0, original);
        assert!(
            h.service
                .validate_access_token(&rotated.access_token.0)
                .await
                .is_some()
        );
        assert!(matches!(
            h.service.refresh(&original).await,
            Err(AuthError::TokenInvalid)
        ));
        assert!(h.service.refresh(&rotated.refresh_token.0).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn newer_login_supersedes_older_refresh_token() -> TestResult {
        let h = harness();
        h.service.register(register_input("a@x.com")).await?;
        let first = h
            .service
            .login(login_input("a@x.com", "pw123456"))
            .await?
            .tokens;
        let second = h
            .service
            .login(login_input("a@x.com", "pw123456"))
            .await?
            .tokens;

        assert!(matches!(
            h.service.refresh(&first.refresh_token.0).await,
            Err(AuthError::TokenInvalid)
        ));
        // Access tokens of the older session stay valid until they expire.
        assert!(
            h.service
                .validate_access_token(&first.access_token.0)
                .await
                .is_some()
        );
        assert!(h.service.refresh(&second.refresh_token.0).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn token_kinds_cannot_be_swapped() -> TestResult {
        let h = harness();
        h.service.register(register_input("a@x.com")).await?;
        let tokens = h
            .service
            .login(login_input("a@x.com", "pw123456"))
            .await?
            .tokens;

        assert!(matches!(
            h.service.refresh(&tokens.access_token.0).await,
            Err(AuthError::TokenInvalid)
        ));
        assert_eq!(
            h.service
                .validate_access_token(&tokens.refresh_token.0)
                .await,
            None
        );
        Ok(())
    }

    #[tokio::test]
    async fn deleted_user_loses_access_and_refresh() -> TestResult {
        let h = harness();
        let user = h.service.register(register_input("a@x.com")).await?;
        let tokens = h
            .service
            .login(login_input("a@x.com", "pw123456"))
            .await?
            .tokens;

        h.users.delete(user.id).await?;

        assert_eq!(
            h.service.validate_access_token(&tokens.access_token.0).await,
            None
        );
        assert!(matches!(
            h.service.refresh(&tokens.refresh_token.0).await,
            Err(AuthError::TokenInvalid)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn garbage_token_validates_to_none() {
        let h = harness();

        assert_eq!(h.service.validate_access_token("garbage").await, None);
    }

    #[tokio::test]
    async fn logout_blacklists_even_when_refresh_removal_fails() -> TestResult {
        let users = Arc::new(MemoryUserRepo::new());
        let mut cache = MockSessionCache::new();
        cache
            .expect_remove_refresh_token()
            .times(1)
            .returning(|_| Err(SessionCacheError::Backend("connection reset".to_string())));
        cache
            .expect_blacklist_token()
            .times(1)
            .withf(|token, ttl| !token.is_empty() && *ttl <= ACCESS_TTL)
            .returning(|_, _| Ok(()));
        let service = service_with_cache(users, Arc::new(cache));

        let token = codec()
            .issue(
                TokenKind::Access,
                &TokenSubject {
                    user_id: UserId(1),
                    email: "a@x.com".to_string(),
                },
            )?
            .token;
        let result = service.logout(UserId(1), &token).await;

        assert!(matches!(result, Err(AuthError::Store(_))));
        Ok(())
    }

    #[tokio::test]
    async fn logout_uses_ceiling_for_unverifiable_token() {
        let users = Arc::new(MemoryUserRepo::new());
        let mut cache = MockSessionCache::new();
        cache
            .expect_remove_refresh_token()
            .times(1)
            .returning(|_| Ok(()));
        cache
            .expect_blacklist_token()
            .times(1)
            .withf(|_, ttl| *ttl == ACCESS_TTL)
            .returning(|_, _| Err(SessionCacheError::Backend("timeout".to_string())));
        let service = service_with_cache(users, Arc::new(cache));

        let result = service.logout(UserId(1), "not-a-jwt").await;

        assert!(matches!(result, Err(AuthError::Store(_))));
    }

    #[tokio::test]
    async fn cache_failure_during_validation_means_anonymous() -> TestResult {
        let users = Arc::new(MemoryUserRepo::new());
        let user = users
            .create(NewUser {
                name: "A".to_string(),
                email: "a@x.com".to_string(),
                password_hash: "unused".to_string(),
            })
            .await?;
        let mut cache = MockSessionCache::new();
        cache
            .expect_is_blacklisted()
            .returning(|_| Err(SessionCacheError::Backend("down".to_string())));
        let service = service_with_cache(users, Arc::new(cache));

        let token = codec()
            .issue(
                TokenKind::Access,
                &TokenSubject {
                    user_id: user.id,
                    email: user.email.clone(),
                },
            )?
            .token;

        assert_eq!(service.validate_access_token(&token).await, None);
        Ok(())
    }
}
