//! Runtime configuration
//!
//! Everything is read from environment variables once at startup. A `.env`
//! file in the working directory is loaded first when present.

use crate::domain::normalize::NormalizeMode;
use crate::error::{AppError, Result};
use crate::ports::llm::LlmConfig;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_BIND: &str = "0.0.0.0:5000";
const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";

/// Upper bound of synchronous `files:annotate` page selection
pub const MAX_OCR_PAGES: u32 = 5;

/// Show only the last 4 characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 4 {
        format!("...{}", chars[chars.len() - 4..].iter().collect::<String>())
    } else {
        "...".to_string()
    }
}

fn masked(secret: &Option<String>) -> Option<String> {
    secret.as_deref().map(mask_secret)
}

/// Gemini settings
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub llm: LlmConfig,
}

/// Google Cloud Vision settings
#[derive(Clone)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub max_pages: u32,
}

/// ElevenLabs settings
#[derive(Clone)]
pub struct ElevenLabsConfig {
    pub api_key: Option<String>,
    pub voice_id: String,
    pub model_id: Option<String>,
}

/// Snowflake SQL API settings
#[derive(Clone)]
pub struct SnowflakeConfig {
    pub account: String,
    pub token: String,
    /// Value of `X-Snowflake-Authorization-Token-Type` (OAUTH, KEYPAIR_JWT, ...)
    pub token_type: String,
    pub database: String,
    pub schema: String,
    pub warehouse: String,
    pub role: Option<String>,
}

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_path: String,
    pub session_capacity: usize,
    pub session_ttl: Duration,
    pub normalize_mode: NormalizeMode,
    pub max_upload_bytes: usize,
    pub gemini: GeminiConfig,
    pub vision: VisionConfig,
    pub elevenlabs: ElevenLabsConfig,
    /// `None` unless both account and token are set
    pub snowflake: Option<SnowflakeConfig>,
    pub firebase_web_api_key: Option<String>,
}

impl AppConfig {
    /// Load `.env` (if any) and read the process environment
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => log::info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = match (get("CLARIMED_BIND"), get("PORT")) {
            (Some(bind), _) => bind,
            (None, Some(port)) => format!("0.0.0.0:{}", port),
            (None, None) => DEFAULT_BIND.to_string(),
        };
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid bind address {}: {}", bind_addr, e)))?;

        let normalize_mode = match get("CLARIMED_NORMALIZE_MODE") {
            Some(mode) => mode.parse()?,
            None => NormalizeMode::default(),
        };

        let llm_defaults = LlmConfig::default();
        let gemini_api_key = get("GEMINI_API_KEY");
        let gemini = GeminiConfig {
            api_key: gemini_api_key.clone(),
            llm: LlmConfig {
                model: get("GEMINI_MODEL").unwrap_or(llm_defaults.model),
                temperature: Some(parse_or(
                    get("GEMINI_TEMPERATURE"),
                    "GEMINI_TEMPERATURE",
                    llm_defaults.temperature.unwrap_or(0.3),
                )?),
                max_tokens: Some(parse_or(
                    get("GEMINI_MAX_TOKENS"),
                    "GEMINI_MAX_TOKENS",
                    llm_defaults.max_tokens.unwrap_or(2048),
                )?),
            },
        };

        let max_pages: u32 = parse_or(get("OCR_MAX_PAGES"), "OCR_MAX_PAGES", MAX_OCR_PAGES)?;
        if !(1..=MAX_OCR_PAGES).contains(&max_pages) {
            return Err(AppError::Config(format!(
                "OCR_MAX_PAGES must be between 1 and {}, got {}",
                MAX_OCR_PAGES, max_pages
            )));
        }
        let vision = VisionConfig {
            api_key: get("GOOGLE_VISION_API_KEY").or(gemini_api_key),
            max_pages,
        };

        let elevenlabs = ElevenLabsConfig {
            api_key: get("ELEVENLABS_API_KEY"),
            voice_id: get("ELEVENLABS_VOICE_ID").unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            model_id: get("ELEVENLABS_MODEL_ID"),
        };

        let snowflake = match (get("SNOWFLAKE_ACCOUNT"), get("SNOWFLAKE_TOKEN")) {
            (Some(account), Some(token)) => Some(SnowflakeConfig {
                account,
                token,
                token_type: get("SNOWFLAKE_TOKEN_TYPE").unwrap_or_else(|| "OAUTH".to_string()),
                database: get("SNOWFLAKE_DATABASE").unwrap_or_else(|| "CLARIMED_DB".to_string()),
                schema: get("SNOWFLAKE_SCHEMA").unwrap_or_else(|| "PUBLIC".to_string()),
                warehouse: get("SNOWFLAKE_WAREHOUSE").unwrap_or_else(|| "COMPUTE_WH".to_string()),
                role: get("SNOWFLAKE_ROLE"),
            }),
            (Some(_), None) => {
                log::warn!("SNOWFLAKE_ACCOUNT is set without SNOWFLAKE_TOKEN; using local terms");
                None
            }
            _ => None,
        };

        let session_capacity: usize =
            parse_or(get("CLARIMED_SESSION_CAPACITY"), "CLARIMED_SESSION_CAPACITY", 1024)?;
        if session_capacity == 0 {
            return Err(AppError::Config(
                "CLARIMED_SESSION_CAPACITY must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            database_path: get("CLARIMED_DB_PATH").unwrap_or_else(|| "clarimed.db".to_string()),
            session_capacity,
            session_ttl: Duration::from_secs(parse_or(
                get("CLARIMED_SESSION_TTL_SECS"),
                "CLARIMED_SESSION_TTL_SECS",
                3600,
            )?),
            normalize_mode,
            max_upload_bytes: parse_or(
                get("CLARIMED_MAX_UPLOAD_BYTES"),
                "CLARIMED_MAX_UPLOAD_BYTES",
                20 * 1024 * 1024,
            )?,
            gemini,
            vision,
            elevenlabs,
            snowflake,
            firebase_web_api_key: get("FIREBASE_WEB_API_KEY"),
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid {} value {:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_path", &self.database_path)
            .field("session_capacity", &self.session_capacity)
            .field("session_ttl", &self.session_ttl)
            .field("normalize_mode", &self.normalize_mode)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("gemini_api_key", &masked(&self.gemini.api_key))
            .field("gemini_model", &self.gemini.llm.model)
            .field("vision_api_key", &masked(&self.vision.api_key))
            .field("elevenlabs_api_key", &masked(&self.elevenlabs.api_key))
            .field("elevenlabs_voice_id", &self.elevenlabs.voice_id)
            .field(
                "snowflake_account",
                &self.snowflake.as_ref().map(|s| s.account.as_str()),
            )
            .field("firebase_web_api_key", &masked(&self.firebase_web_api_key))
            .finish()
    }
}
