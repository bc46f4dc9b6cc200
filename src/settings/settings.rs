use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub hasher: Hasher,
    pub session: Session,
    pub user: User,
    pub http: Http,
    pub log: Log,
}

#[derive(Deserialize)]
pub struct Auth {
    /// Usually supplied through `SENTINEL_AUTH__JWT_SECRET`.
    pub jwt_secret: Option<String>,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

// Hand-written so the secret never reaches the logs.
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Hasher {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub backend: String, // "memory" or "redis"
    pub redis_url: String,
    pub key_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub backend: String, // "memory" or "mysql"
    pub database_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
    /// Rolling file output next to stdout; absent means stdout only.
    #[serde(default)]
    pub file: Option<LogFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogFile {
    pub directory: String,
    pub filename: String,
    #[serde(default)]
    pub rotation: LogRotation,
    /// Rotated files kept on disk; older ones are deleted.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

fn default_max_files() -> usize {
    7
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "SENTINEL";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
