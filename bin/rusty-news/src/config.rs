//! Process configuration read from the environment (and `.env`).

use std::{env, fmt::Display, io, str::FromStr, time::Duration};

use chrono::TimeDelta;
use rn_core::{EngineConfig, DEFAULT_GRAVITY};

const DEV_SECRET: &str = "rusty-news-dev-secret";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth_secret: String,
    pub cors_origin: String,
    pub engine: EngineConfig,
}

impl Config {
    pub fn load() -> io::Result<Self> {
        let ranking_window = ranking_window(try_load("RANKING_WINDOW_DAYS", "0")?)?;
        let gravity: f64 = try_load("RANKING_GRAVITY", &DEFAULT_GRAVITY.to_string())?;
        if !gravity.is_finite() || gravity <= 0.0 {
            return Err(invalid("RANKING_GRAVITY", "must be a positive number"));
        }

        Ok(Self {
            host: try_load("HOST", "127.0.0.1")?,
            port: try_load("PORT", "8080")?,
            database_url: try_load("DATABASE_URL", "sqlite:rusty_news.db")?,
            auth_secret: auth_secret(),
            cors_origin: try_load("CORS_ORIGIN", "http://localhost:3000")?,
            engine: EngineConfig {
                page_size: try_load::<usize>("ITEMS_PER_PAGE", "30")?.max(1),
                gravity,
                store_timeout: Duration::from_millis(try_load("STORE_TIMEOUT_MS", "5000")?),
                ranking_window,
            },
        })
    }
}

/// Zero or less leaves the ranked feeds unbounded.
fn ranking_window(days: i64) -> io::Result<Option<TimeDelta>> {
    if days <= 0 {
        return Ok(None);
    }
    TimeDelta::try_days(days)
        .map(Some)
        .ok_or_else(|| invalid("RANKING_WINDOW_DAYS", format!("{days} days is out of range")))
}

fn invalid(key: &str, reason: impl Display) -> io::Error {
    log::warn!("Invalid {key} value: {reason}");
    io::Error::new(io::ErrorKind::InvalidInput, format!("{key}: {reason}"))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> io::Result<T>
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| invalid(key, e))
}

fn auth_secret() -> String {
    match env::var("AUTH_SECRET") {
        Ok(secret) if !secret.trim().is_empty() => secret,
        _ => {
            log::warn!("AUTH_SECRET not set, using the development secret");
            DEV_SECRET.to_string()
        }
    }
}
