use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;

/// Wires the services to their backends. Built once at startup; every
/// collaborator is injected so tests can swap in memory backends.
pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pool: Option<MySqlPool>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let signing_key = settings
            .auth
            .jwt_secret
            .clone()
            .unwrap_or_default()
            .into_bytes();
        // A missing secret is fatal here, before any request is served.
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            signing_key,
            access_ttl: Duration::from_secs(settings.auth.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.auth.refresh_ttl_secs),
        })?);

        let credential_hasher: Arc<dyn CredentialHasher> =
            Arc::new(Argon2PasswordHasher::with_params(
                settings.hasher.memory_kib,
                settings.hasher.iterations,
                settings.hasher.parallelism,
            )?);

        let session_cache: Arc<dyn SessionCache> = match settings.session.backend.as_str() {
            "memory" => Arc::new(MemorySessionCache::new(settings.session.key_prefix.clone())),
            "redis" => Arc::new(
                RedisSessionCache::connect(
                    &settings.session.redis_url,
                    settings.session.key_prefix.clone(),
                )
                .await?,
            ),
            other => return Err(anyhow::anyhow!("Unknown session backend: {}", other)),
        };

        let mut pool = None;
        let user_repo: Arc<dyn UserRepo> = match settings.user.backend.as_str() {
            "memory" => Arc::new(MemoryUserRepo::new()),
            "mysql" => {
                let mysql = MySqlPool::connect(&settings.user.database_url).await?;
                pool = Some(mysql.clone());
                Arc::new(MySqlUserRepo::new(mysql))
            }
            other => return Err(anyhow::anyhow!("Unknown user backend: {}", other)),
        };

        info!(
            session_backend = %settings.session.backend,
            user_backend = %settings.user.backend,
            "server started"
        );

        let mut server = Self::with_backends(user_repo, session_cache, token_codec, credential_hasher);
        server.pool = pool;
        Ok(server)
    }

    pub fn with_backends(
        user_repo: Arc<dyn UserRepo>,
        session_cache: Arc<dyn SessionCache>,
        token_codec: Arc<dyn TokenCodec>,
        credential_hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo.clone(),
            credential_hasher.clone(),
            token_codec,
            session_cache,
        ));
        let user_service: Arc<dyn UserService> =
            Arc::new(RealUserService::new(user_repo, credential_hasher));

        Self {
            auth_service,
            user_service,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("user store pool closed");
        }
    }
}
