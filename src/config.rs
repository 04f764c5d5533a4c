use std::{env, str::FromStr};

use anyhow::{Context, anyhow};
use chrono::FixedOffset;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Timezone every attendance day and shift time is read in.
    pub org_offset: FixedOffset,
    pub late_threshold_minutes: i64,
    pub early_threshold_minutes: i64,

    /// Bootstrap account, created at startup when both are set.
    pub superadmin_username: Option<String>,
    pub superadmin_password: Option<String>,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} has an invalid value {raw:?}: {e}")),
        None => Ok(default),
    }
}

/// Parses `+HH:MM` / `-HH:MM`.
pub fn parse_utc_offset(value: &str) -> anyhow::Result<FixedOffset> {
    let value = value.trim();
    let (sign, rest) = match value.chars().next() {
        Some('+') => (1, &value[1..]),
        Some('-') => (-1, &value[1..]),
        _ => return Err(anyhow!("offset {value:?} must start with + or -")),
    };
    let (hh, mm) = rest
        .split_once(':')
        .ok_or_else(|| anyhow!("offset {value:?} must look like +HH:MM"))?;
    let hours: i32 = hh.parse().with_context(|| format!("bad hours in {value:?}"))?;
    let minutes: i32 = mm.parse().with_context(|| format!("bad minutes in {value:?}"))?;
    if hh.len() != 2 || mm.len() != 2 || minutes >= 60 {
        return Err(anyhow!("offset {value:?} must look like +HH:MM"));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("offset {value:?} is out of range"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed("ACCESS_TOKEN_TTL", 900)?, // 15 min

            rate_login_per_min: parsed("RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: optional("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            org_offset: parse_utc_offset(
                optional("ORG_UTC_OFFSET").as_deref().unwrap_or("+07:00"),
            )
            .context("ORG_UTC_OFFSET")?,
            late_threshold_minutes: parsed("LATE_THRESHOLD_MINUTES", 5)?,
            early_threshold_minutes: parsed("EARLY_THRESHOLD_MINUTES", 5)?,

            superadmin_username: optional("SUPERADMIN_USERNAME"),
            superadmin_password: optional("SUPERADMIN_PASSWORD"),

            log_dir: optional("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: parsed("LOG_LEVEL", tracing::Level::DEBUG)?,
        })
    }
}
