use std::sync::Arc;
use std::time::Duration;

use crate::batch::PollConfig;
use crate::engine::judge0::{Judge0Engine, RapidApiAuth};
use crate::engine::sphere::SphereEngine;
use crate::engine::stubs::{StubEngine, accepted_result};
use crate::engine::traits::JudgeEngine;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is required for engine {1}")]
    MissingVariable(&'static str, &'static str),
    #[error("Unrecognized engine kind: {0:?} (expected judge0, sphere or stub)")]
    UnknownEngine(String),
    #[error("Failed to parse {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineKind {
    Judge0,
    Sphere,
    Stub,
}

/// Engine selection and credentials, read from the environment.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub kind: EngineKind,
    pub judge0_url: Option<String>,
    pub judge0_api_key: Option<String>,
    pub judge0_api_host: Option<String>,
    pub sphere_endpoint: Option<String>,
    pub sphere_token: Option<String>,
    pub sphere_wait: bool,
    pub poll: PollConfig,
}

impl EngineConfig {
    /// Read configuration from `JUDGE_ENGINE` and the engine-specific
    /// variables. Absent optional variables fall back to defaults; the
    /// stub engine needs nothing at all.
    pub fn from_env() -> Result<Self, ConfigError> {
        let kind = match std::env::var("JUDGE_ENGINE")
            .unwrap_or_else(|_| "stub".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "judge0" => EngineKind::Judge0,
            "sphere" => EngineKind::Sphere,
            "stub" => EngineKind::Stub,
            other => return Err(ConfigError::UnknownEngine(other.to_string())),
        };

        let mut poll = PollConfig::default();
        if let Some(ms) = parse_ms("POLL_INTERVAL_MS")? {
            poll.interval = ms;
        }
        if let Some(ms) = parse_ms("POLL_TIMEOUT_MS")? {
            poll.budget = ms;
        }

        Ok(Self {
            kind,
            judge0_url: std::env::var("JUDGE0_URL").ok(),
            judge0_api_key: std::env::var("JUDGE0_API_KEY").ok(),
            judge0_api_host: std::env::var("JUDGE0_API_HOST").ok(),
            sphere_endpoint: std::env::var("SPHERE_ENDPOINT").ok(),
            sphere_token: std::env::var("SPHERE_TOKEN").ok(),
            sphere_wait: std::env::var("SPHERE_WAIT")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            poll,
        })
    }
}

fn parse_ms(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(None),
        Ok(value) => value
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}

/// Build the configured engine adapter.
pub fn build_engine(config: &EngineConfig) -> Result<Arc<dyn JudgeEngine>, ConfigError> {
    match config.kind {
        EngineKind::Judge0 => {
            let base_url = config
                .judge0_url
                .clone()
                .ok_or(ConfigError::MissingVariable("JUDGE0_URL", "judge0"))?;
            let auth = match (&config.judge0_api_key, &config.judge0_api_host) {
                (Some(key), Some(host)) => Some(RapidApiAuth {
                    key: key.clone(),
                    host: host.clone(),
                }),
                _ => None,
            };
            Ok(Arc::new(Judge0Engine::new(base_url, auth)))
        }
        EngineKind::Sphere => {
            let endpoint = config
                .sphere_endpoint
                .clone()
                .ok_or(ConfigError::MissingVariable("SPHERE_ENDPOINT", "sphere"))?;
            let token = config
                .sphere_token
                .clone()
                .ok_or(ConfigError::MissingVariable("SPHERE_TOKEN", "sphere"))?;
            Ok(Arc::new(SphereEngine::new(
                endpoint,
                token,
                config.sphere_wait,
            )))
        }
        EngineKind::Stub => {
            // Answers every request with an accepted empty run; callers
            // script specific outputs via `respond_with`.
            let engine = StubEngine::new(Duration::from_millis(50), 1, false)
                .respond_with("", accepted_result(""));
            Ok(Arc::new(engine))
        }
    }
}
