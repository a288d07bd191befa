use crate::error::{Error, Result};
use crate::services::match_scorer::MatchWeights;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub api_rps: u32,
    pub cors_allowed_origins: Vec<String>,
    pub engine: EngineConfig,
}

/// Tunables of the matching and re-engagement engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub generation_timeout: Duration,
    pub cooldown_days: i64,
    pub stale_contact_days: i64,
    pub tenure_thresholds_months: Vec<u32>,
    pub max_recommended_jobs: usize,
    pub recruiter_name: String,
    pub weights: MatchWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(20),
            cooldown_days: 90,
            stale_contact_days: 60,
            tenure_thresholds_months: vec![12, 24, 36],
            max_recommended_jobs: 5,
            recruiter_name: "Recruiter".to_string(),
            weights: MatchWeights::default(),
        }
    }
}

const MAX_DAYS_SETTING: i64 = 3650;
const MAX_TENURE_THRESHOLD_MONTHS: u32 = 1200;

impl EngineConfig {
    /// Rejects day and month settings the date arithmetic cannot honour.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_DAYS_SETTING).contains(&self.cooldown_days) {
            return Err(Error::Config(format!(
                "COOLDOWN_DAYS must be between 1 and {}",
                MAX_DAYS_SETTING
            )));
        }
        if !(0..=MAX_DAYS_SETTING).contains(&self.stale_contact_days) {
            return Err(Error::Config(format!(
                "STALE_CONTACT_DAYS must be between 0 and {}",
                MAX_DAYS_SETTING
            )));
        }
        if let Some(months) = self
            .tenure_thresholds_months
            .iter()
            .find(|m| **m == 0 || **m > MAX_TENURE_THRESHOLD_MONTHS)
        {
            return Err(Error::Config(format!(
                "TENURE_THRESHOLDS_MONTHS entry {} must be between 1 and {}",
                months, MAX_TENURE_THRESHOLD_MONTHS
            )));
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            generation_timeout: Duration::from_secs(get_env_parse_or(
                "GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout.as_secs(),
            )?),
            cooldown_days: get_env_parse_or("COOLDOWN_DAYS", defaults.cooldown_days)?,
            stale_contact_days: get_env_parse_or("STALE_CONTACT_DAYS", defaults.stale_contact_days)?,
            tenure_thresholds_months: match env::var("TENURE_THRESHOLDS_MONTHS") {
                Ok(raw) => parse_thresholds(&raw)?,
                Err(_) => defaults.tenure_thresholds_months,
            },
            max_recommended_jobs: get_env_parse_or(
                "MAX_RECOMMENDED_JOBS",
                defaults.max_recommended_jobs,
            )?,
            recruiter_name: env::var("RECRUITER_NAME").unwrap_or(defaults.recruiter_name),
            weights: match env::var("MATCH_WEIGHTS") {
                Ok(raw) => raw.parse::<MatchWeights>()?,
                Err(_) => defaults.weights,
            },
        };

        engine.validate()?;

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            api_rps: get_env_parse_or("API_RPS", 50)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            engine,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn parse_thresholds(raw: &str) -> Result<Vec<u32>> {
    let mut thresholds = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>().map_err(|e| {
                Error::Config(format!("Invalid value for TENURE_THRESHOLDS_MONTHS: {}", e))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    thresholds.sort_unstable();
    thresholds.dedup();
    Ok(thresholds)
}
