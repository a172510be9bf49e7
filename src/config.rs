use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub judge0_api_url: String,
    pub judge0_api_key: Option<String>,
    pub judge_poll_timeout_ms: u64,
    pub judge_poll_interval_ms: u64,
    pub judge_memory_limit_kb: u32,
    pub grading_concurrency: usize,
    pub ats_service_url: String,
    pub ats_timeout_ms: u64,
    pub storage_url: Option<String>,
    pub storage_service_key: Option<String>,
    pub storage_fallback_buckets: Vec<String>,
    pub batch_concurrency: usize,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            judge0_api_url: get_env_or("JUDGE0_API_URL", "http://localhost:2358"),
            judge0_api_key: env::var("JUDGE0_API_KEY").ok().filter(|k| !k.is_empty()),
            judge_poll_timeout_ms: get_env_parse_or("JUDGE_POLL_TIMEOUT_MS", 30_000)?,
            judge_poll_interval_ms: get_env_parse_or("JUDGE_POLL_INTERVAL_MS", 1_000)?,
            judge_memory_limit_kb: get_env_parse_or("JUDGE_MEMORY_LIMIT_KB", 128_000)?,
            grading_concurrency: get_env_parse_or("GRADING_CONCURRENCY", 4)?,
            ats_service_url: get_env_or("ATS_SERVICE_URL", "http://localhost:8000"),
            ats_timeout_ms: get_env_parse_or("ATS_TIMEOUT_MS", 30_000)?,
            storage_url: env::var("STORAGE_URL").ok(),
            storage_service_key: env::var("STORAGE_SERVICE_KEY").ok(),
            storage_fallback_buckets: parse_list(&get_env_or("STORAGE_FALLBACK_BUCKETS", "resumes,cvs")),
            batch_concurrency: get_env_parse_or("BATCH_CONCURRENCY", 4)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
