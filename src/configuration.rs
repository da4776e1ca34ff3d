use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    /// When absent the server keeps accounts in process memory.
    #[serde(default)]
    pub database: Option<DatabaseSettings>,
    pub jwt: JwtSettings,
    pub media: MediaSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// bcrypt work factor used when hashing new passwords
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Signing settings for both token classes.
///
/// Access and refresh tokens are signed with separate secrets so a token of one
/// class never verifies as the other.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub access_token_secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,   // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_secret: String,
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl JwtSettings {
    /// Reject settings that would make the two token classes interchangeable
    /// or produce tokens that are born expired.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.access_token_secret".to_string()));
        }
        if self.refresh_token_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.refresh_token_secret".to_string()));
        }
        if self.access_token_secret == self.refresh_token_secret {
            return Err(ConfigError::InvalidValue(
                "jwt.access_token_secret and jwt.refresh_token_secret must differ".to_string(),
            ));
        }
        if self.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue("jwt.access_token_expiry".to_string()));
        }
        if self.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue("jwt.refresh_token_expiry".to_string()));
        }
        Ok(())
    }
}

/// Media-hosting service used for avatars and cover images
#[derive(serde::Deserialize, Clone)]
pub struct MediaSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_media_timeout")]
    pub timeout_milliseconds: u64,
}

impl MediaSettings {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_milliseconds)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_password_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_max_connections() -> u32 {
    5
}

fn default_access_token_expiry() -> i64 {
    900
}

fn default_refresh_token_expiry() -> i64 {
    604_800
}

fn default_issuer() -> String {
    "userhub".to_string()
}

fn default_media_timeout() -> u64 {
    10_000
}

/// Load settings from `configuration.yaml` (optional) overlaid with `APP__*`
/// environment variables, e.g. `APP__JWT__REFRESH_TOKEN_SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    let settings = settings
        .try_deserialize::<Settings>()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    settings.jwt.validate()?;
    Ok(settings)
}
