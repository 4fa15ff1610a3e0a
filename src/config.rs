use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::services::{gemini, mercadopago};

const DEV_JWT_SECRET: &str = "troque_esta_chave_em_producao";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub jwt_secret: String,
    pub mp_access_token: Option<String>,
    pub mp_api_base: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub users_file: PathBuf,
    pub allow_simulated_payments: bool,
    pub debug_mode: bool,
    pub allowed_origins: Option<String>,
    pub rate_limit_per_minute: u32,
}

impl Config {
    /// Reads the process environment; call after `dotenvy::dotenv()`.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = optional("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let mp_access_token = optional("MP_ACCESS_TOKEN");
        if mp_access_token.is_none() {
            warn!("MP_ACCESS_TOKEN is not set. Mercado Pago calls will fail.");
        }

        let gemini_api_key = optional("GEMINI_API_KEY").or_else(|| optional("API_KEY"));
        if gemini_api_key.is_none() {
            warn!("GEMINI_API_KEY is not set. Number generation will be unavailable.");
        }

        Ok(Self {
            host: optional("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or("PORT", 4000)?,
            frontend_url: optional("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            jwt_secret,
            mp_access_token,
            mp_api_base: optional("MP_API_BASE")
                .unwrap_or_else(|| mercadopago::DEFAULT_MP_API_BASE.to_string()),
            gemini_api_key,
            gemini_model: optional("GEMINI_MODEL")
                .unwrap_or_else(|| gemini::DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_base: optional("GEMINI_API_BASE")
                .unwrap_or_else(|| gemini::DEFAULT_GEMINI_API_BASE.to_string()),
            users_file: optional("USERS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/users.json")),
            allow_simulated_payments: flag("ALLOW_SIMULATED_PAYMENTS"),
            debug_mode: flag("DEBUG_MODE"),
            allowed_origins: optional("ALLOWED_ORIGINS"),
            rate_limit_per_minute: parse_or("RATE_LIMIT_PER_MINUTE", 30)?,
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn flag(key: &str) -> bool {
    optional(key)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} must be a valid value: {e}")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
