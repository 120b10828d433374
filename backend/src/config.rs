use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
    pub loader: LoaderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Metrics store connection settings.
///
/// `url` wins when set; otherwise the DSN is assembled from the components.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Pre-encoded client credentials, sent as `Authorization: Basic <auth_key>`
    pub auth_key: String,
    pub scope: String,
    pub oauth_url: String,
    pub chat_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// HTTP client timeout in seconds (accepts "60s", "2m")
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub timeout_secs: u64,
    /// The provider's endpoints are signed by a CA most trust stores lack
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub data_path: String,
    pub batch_size: usize,
}

impl Config {
    /// Load configuration with environment variable override support
    ///
    /// Loading order:
    /// 1. Read `.env` into the process environment (if present)
    /// 2. Load from config.toml file
    /// 3. Override with environment variables
    /// 4. Validate the final configuration
    pub fn load() -> Result<Self, anyhow::Error> {
        let _ = dotenvy::dotenv();

        let mut config = if let Some(config_path) = Self::find_config_file() {
            Self::from_toml(&config_path)?
        } else {
            tracing::warn!("Configuration file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - APP_SERVER_HOST / APP_SERVER_PORT
    /// - APP_DATABASE_URL: full DSN, wins over the components below
    /// - APP_DB_HOST, APP_DB_PORT, APP_DB_NAME, APP_DB_USER, APP_DB_PASSWORD
    ///   (also accepted without the APP_ prefix)
    /// - APP_DB_MAX_CONNECTIONS
    /// - APP_LLM_AUTH_KEY / GIGACHAT_AUTH_KEY: provider API key
    /// - APP_LLM_SCOPE / GIGACHAT_SCOPE: provider scope identifier
    /// - APP_LLM_MODEL
    /// - APP_LLM_TIMEOUT_SECS (accepts "60s", "2m")
    /// - APP_LOG_LEVEL
    /// - APP_DATA_PATH / DATA_PATH: loader input file
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("APP_SERVER_HOST") {
            self.server.host = host;
            tracing::info!("Override server.host from env: {}", self.server.host);
        }

        if let Ok(port) = std::env::var("APP_SERVER_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
            tracing::info!("Override server.port from env: {}", self.server.port);
        }

        if let Ok(db_url) = std::env::var("APP_DATABASE_URL") {
            self.database.url = Some(db_url);
            tracing::info!("Override database.url from env");
        }

        if let Some(host) = env_any(&["APP_DB_HOST", "DB_HOST"]) {
            self.database.host = host;
            tracing::info!("Override database.host from env: {}", self.database.host);
        }

        if let Some(port) = env_any(&["APP_DB_PORT", "DB_PORT"])
            && let Ok(port) = port.parse()
        {
            self.database.port = port;
            tracing::info!("Override database.port from env: {}", self.database.port);
        }

        if let Some(name) = env_any(&["APP_DB_NAME", "DB_NAME"]) {
            self.database.name = name;
            tracing::info!("Override database.name from env: {}", self.database.name);
        }

        if let Some(user) = env_any(&["APP_DB_USER", "DB_USER"]) {
            self.database.user = user;
            tracing::info!("Override database.user from env");
        }

        if let Some(password) = env_any(&["APP_DB_PASSWORD", "DB_PASSWORD"]) {
            self.database.password = password;
            tracing::info!("Override database.password from env");
        }

        if let Ok(max) = std::env::var("APP_DB_MAX_CONNECTIONS")
            && let Ok(max) = max.parse()
        {
            self.database.max_connections = max;
            tracing::info!(
                "Override database.max_connections from env: {}",
                self.database.max_connections
            );
        }

        if let Some(key) = env_any(&["APP_LLM_AUTH_KEY", "GIGACHAT_AUTH_KEY"]) {
            self.llm.auth_key = key;
            tracing::info!("Override llm.auth_key from env");
        }

        if let Some(scope) = env_any(&["APP_LLM_SCOPE", "GIGACHAT_SCOPE"]) {
            self.llm.scope = scope;
            tracing::info!("Override llm.scope from env: {}", self.llm.scope);
        }

        if let Ok(model) = std::env::var("APP_LLM_MODEL") {
            self.llm.model = model;
            tracing::info!("Override llm.model from env: {}", self.llm.model);
        }

        if let Ok(timeout) = std::env::var("APP_LLM_TIMEOUT_SECS") {
            match parse_duration_to_secs(&timeout) {
                Ok(val) => {
                    self.llm.timeout_secs = val;
                    tracing::info!("Override llm.timeout_secs from env: {}", val);
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_LLM_TIMEOUT_SECS '{}': {} (keep {})",
                    timeout,
                    e,
                    self.llm.timeout_secs
                ),
            }
        }

        if let Ok(level) = std::env::var("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Some(path) = env_any(&["APP_DATA_PATH", "DATA_PATH"]) {
            self.loader.data_path = path;
            tracing::info!("Override loader.data_path from env: {}", self.loader.data_path);
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.llm.auth_key.is_empty() {
            tracing::warn!("llm.auth_key is empty, every question will be answered with 0");
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.database.url.as_deref().is_some_and(str::is_empty) {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be > 0");
        }
        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!("database.min_connections cannot exceed database.max_connections");
        }

        if self.llm.max_tokens == 0 {
            anyhow::bail!("llm.max_tokens must be > 0");
        }
        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be > 0");
        }

        if self.loader.batch_size == 0 {
            anyhow::bail!("loader.batch_size must be > 0");
        }

        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl DatabaseConfig {
    /// Connection string for the metrics store.
    pub fn dsn(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.name
            ),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            name: "video_metrics".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            max_connections: 10,
            min_connections: 1,
            run_migrations: true,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            auth_key: String::new(),
            scope: "GIGACHAT_API_PERS".to_string(),
            oauth_url: "https://ngw.devices.sberbank.ru:9443/api/v2/oauth".to_string(),
            chat_url: "https://gigachat.devices.sberbank.ru/api/v1/chat/completions".to_string(),
            model: "GigaChat".to_string(),
            temperature: 0.0,
            max_tokens: 260,
            timeout_secs: 60,
            accept_invalid_certs: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,video_metrics=debug".to_string(), file: None }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { data_path: "./data/videos.json".to_string(), batch_size: 1000 }
    }
}

// =========================
// Helpers for parsing values
// =========================

fn env_any(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| std::env::var(name).ok())
}

fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    // Accept plain numbers (treated as seconds)
    if let Ok(val) = input.parse::<u64>() {
        return Ok(val);
    }

    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".into());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Ok(n),
        "m" | "min" | "mins" | "minute" | "minutes" => Ok(n * 60),
        "h" | "hr" | "hour" | "hours" => Ok(n * 60 * 60),
        _ => Err(format!("unsupported unit: {}", unit)),
    }
}

// Accepts numeric seconds or human-friendly strings
fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of seconds or a string like '30s', '5m', '1h'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}
