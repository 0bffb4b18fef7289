use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    broadcast::{
        BroadcastConfig, DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_MAX_PAYLOAD_CHARS, DEFAULT_PACING,
    },
    domain::UserId,
    errors::Error,
    Result,
};

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub owner_id: UserId,

    // Storage
    pub db_file: PathBuf,
    pub export_path: PathBuf,

    // Broadcast
    pub broadcast_delay: Duration,
    pub broadcast_max_len: usize,
    pub broadcast_max_concurrent: usize,

    // Listings
    pub list_users_limit: usize,
    pub list_broadcasts_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests feed a map instead of the env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let str_of = |key: &str| lookup(key).and_then(non_empty);
        let parse_of = |key: &str| -> Result<Option<u64>> {
            match str_of(key) {
                None => Ok(None),
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| Error::Config(format!("{key} must be a non-negative integer"))),
            }
        };

        // Required
        let telegram_bot_token = str_of("TG_BOT_TOKEN").ok_or_else(|| {
            Error::Config(
                "Please set TG_BOT_TOKEN environment variable before running the bot.".to_string(),
            )
        })?;
        let owner_id = str_of("OWNER_ID")
            .ok_or_else(|| Error::Config("OWNER_ID environment variable is required".to_string()))?
            .trim()
            .parse::<i64>()
            .map(UserId)
            .map_err(|_| Error::Config("OWNER_ID must be a numeric Telegram user id".to_string()))?;

        let db_file = PathBuf::from(str_of("DB_FILE").unwrap_or_else(|| "botdata.db".to_string()));
        let export_path = PathBuf::from(
            str_of("EXPORT_PATH").unwrap_or_else(|| "users_export.csv".to_string()),
        );

        let broadcast_delay = parse_of("BROADCAST_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PACING);
        let broadcast_max_len = parse_of("BROADCAST_MAX_LEN")?
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MAX_PAYLOAD_CHARS);
        if broadcast_max_len == 0 {
            return Err(Error::Config("BROADCAST_MAX_LEN must be positive".to_string()));
        }
        let broadcast_max_concurrent = parse_of("BROADCAST_MAX_CONCURRENT")?
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_JOBS)
            .max(1);

        let list_users_limit = parse_of("LIST_USERS_LIMIT")?
            .map(|v| v as usize)
            .unwrap_or(200);
        let list_broadcasts_limit = parse_of("LIST_BROADCASTS_LIMIT")?
            .map(|v| v as usize)
            .unwrap_or(10);

        Ok(Self {
            telegram_bot_token,
            owner_id,
            db_file,
            export_path,
            broadcast_delay,
            broadcast_max_len,
            broadcast_max_concurrent,
            list_users_limit,
            list_broadcasts_limit,
        })
    }

    pub fn broadcast(&self) -> BroadcastConfig {
        BroadcastConfig {
            pacing: self.broadcast_delay,
            max_payload_chars: self.broadcast_max_len,
            max_concurrent_jobs: self.broadcast_max_concurrent,
        }
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let Some((key, val)) = parse_dotenv_line(raw) else {
            continue;
        };
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv_line(raw: &str) -> Option<(String, String)> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (k, v) = line.split_once('=')?;
    let key = k.trim().trim_start_matches("export ").trim();
    if key.is_empty() {
        return None;
    }

    let mut val = v.trim();
    // Strip optional surrounding quotes.
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        val = &val[1..val.len() - 1];
    }

    Some((key.to_string(), val.to_string()))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
