use scoring::ScoreWeights;
use wizard_session::model::AutoApplyMode;

/// Recognized operational knobs (spec §6 Configuration). Loaded once at
/// startup and handed to `WizardService` by value; nothing here is mutated
/// after construction, matching spec §4.2's "loaded once at startup"
/// requirement for score weights.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    pub session_ttl_secs: i64,
    pub max_stores_default: u8,
    pub max_stores_ceiling: u8,
    pub rate_limit_starts_per_hour: u32,
    pub candidates_per_item: usize,
    pub size_tolerance_pct: f64,
    pub trigram_threshold: f32,
    pub score_weights: ScoreWeights,
    pub retry_attempts_commit: u32,
    pub auto_apply_mode: AutoApplyMode,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 30 * 60,
            max_stores_default: 1,
            max_stores_ceiling: 2,
            rate_limit_starts_per_hour: 5,
            candidates_per_item: 5,
            size_tolerance_pct: 20.0,
            trigram_threshold: 0.3,
            score_weights: ScoreWeights::default(),
            retry_attempts_commit: 3,
            auto_apply_mode: AutoApplyMode::Conservative,
        }
    }
}
