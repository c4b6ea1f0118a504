use std::str::FromStr;

use danci_learner_algo::LearnerModelConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Mirror log output into daily files under `log_dir`
    pub file_logs: bool,
    pub log_dir: String,
    pub model: LearnerModelConfig,
    /// Fixed screening seed; a fresh random seed per session when unset
    pub screening_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            file_logs: false,
            log_dir: "./logs".to_string(),
            model: LearnerModelConfig::default(),
            screening_seed: None,
        }
    }
}

impl Config {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Unparseable
    /// values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(level) = lookup("RUST_LOG") {
            config.log_level = level;
        }
        config.file_logs = lookup("ENABLE_FILE_LOGS").is_some_and(|v| v == "true" || v == "1");
        if let Some(dir) = lookup("LOG_DIR").filter(|d| !d.trim().is_empty()) {
            config.log_dir = dir;
        }

        let placement = &mut config.model.placement;
        if let Some(v) = parse(&lookup, "PLACEMENT_MIN_RESPONSES") {
            placement.min_responses = v;
        }
        if let Some(v) = parse(&lookup, "PLACEMENT_MAX_RESPONSES") {
            placement.max_responses = v;
        }
        if placement.max_responses < placement.min_responses {
            tracing::warn!(
                min = placement.min_responses,
                max = placement.max_responses,
                "PLACEMENT_MAX_RESPONSES below minimum, raising it"
            );
            placement.max_responses = placement.min_responses;
        }

        let cat = &mut config.model.assessment.cat;
        let target_se = parse::<f64, _>(&lookup, "CAT_TARGET_SE");
        if let Some(v) = target_se.filter(|v| v.is_finite() && *v > 0.0) {
            cat.target_se = v;
        }
        if let Some(v) = parse::<u32, _>(&lookup, "CAT_MAX_RESPONSES").filter(|v| *v > 0) {
            cat.max_responses = v;
        }
        if let Some(v) = parse::<u32, _>(&lookup, "CAT_MAX_EXPOSURE").filter(|v| *v > 0) {
            cat.max_exposure = v;
        }

        config.screening_seed = parse(&lookup, "SCREENING_SEED");
        config
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}
