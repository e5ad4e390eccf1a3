use scoring::ScoreWeights;
use wizard::WizardConfig;
use wizard_session::model::AutoApplyMode;

/// Process-wide settings, assembled once at startup from the environment.
/// Mirrors the shape of `WizardConfig` but adds the connection strings and
/// knobs that only make sense at the binary boundary.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,

    pub session_ttl_secs: i64,
    pub max_stores_default: u8,
    pub max_stores_ceiling: u8,
    pub rate_limit_starts_per_hour: u32,
    pub candidates_per_item: usize,
    pub size_tolerance_pct: f64,
    pub trigram_threshold: f32,
    pub retry_attempts_commit: u32,
    pub auto_apply_mode: AutoApplyMode,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/wizard_dev".to_string());
        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1".to_string());

        Self {
            database_url,
            redis_url,
            session_ttl_secs: env_i64("WIZARD_SESSION_TTL_SECS", 30 * 60),
            max_stores_default: env_u8("WIZARD_MAX_STORES_DEFAULT", 1),
            max_stores_ceiling: env_u8("WIZARD_MAX_STORES_CEILING", 2),
            rate_limit_starts_per_hour: env_u32("WIZARD_RATE_LIMIT_STARTS_PER_HOUR", 5),
            candidates_per_item: env_usize("WIZARD_CANDIDATES_PER_ITEM", 5),
            size_tolerance_pct: env_f64("WIZARD_SIZE_TOLERANCE_PCT", 20.0),
            trigram_threshold: env_f32("WIZARD_TRIGRAM_THRESHOLD", 0.3),
            retry_attempts_commit: env_u32("WIZARD_COMMIT_RETRY_ATTEMPTS", 3),
            auto_apply_mode: match std::env::var("WIZARD_AUTO_APPLY_MODE").as_deref() {
                Ok("balanced") => AutoApplyMode::Balanced,
                Ok("aggressive") => AutoApplyMode::Aggressive,
                _ => AutoApplyMode::Conservative,
            },
        }
    }

    pub fn wizard_config(&self) -> WizardConfig {
        WizardConfig {
            session_ttl_secs: self.session_ttl_secs,
            max_stores_default: self.max_stores_default,
            max_stores_ceiling: self.max_stores_ceiling,
            rate_limit_starts_per_hour: self.rate_limit_starts_per_hour,
            candidates_per_item: self.candidates_per_item,
            size_tolerance_pct: self.size_tolerance_pct,
            trigram_threshold: self.trigram_threshold,
            score_weights: ScoreWeights::default(),
            retry_attempts_commit: self.retry_attempts_commit,
            auto_apply_mode: self.auto_apply_mode,
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u8(key: &str, default: u8) -> u8 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
