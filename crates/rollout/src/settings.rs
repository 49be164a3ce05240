//! Engine settings derived from the configuration file

use std::time::Duration;

use roller_config::Config;
use roller_errors::Error;
use roller_state::models::duration_millis;

use crate::builtin::BuiltinDistribution;

/// Runtime settings of the rollout engine.
#[derive(Debug, Clone)]
pub struct RolloutSettings {
    /// How long an instance counts as active after its last check-in.
    pub instance_validity: Duration,
    /// Serialize stats, decision and grant per group.
    pub strict_admission: bool,
    /// Default lookback of activity queries.
    pub activity_window: Duration,
    pub status_history_limit: u32,
    pub builtin: Option<BuiltinDistribution>,
}

impl Default for RolloutSettings {
    fn default() -> Self {
        Self {
            instance_validity: Duration::from_secs(24 * 60 * 60),
            strict_admission: true,
            activity_window: Duration::from_secs(3 * 24 * 60 * 60),
            status_history_limit: 20,
            builtin: None,
        }
    }
}

impl RolloutSettings {
    /// Build settings from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        let rollout = &config.rollout;
        Ok(Self {
            instance_validity: rollout.instance_validity(),
            strict_admission: rollout.strict_admission,
            activity_window: Duration::from_secs(
                u64::from(rollout.activity_window_days) * 24 * 60 * 60,
            ),
            status_history_limit: rollout.status_history_limit,
            builtin: BuiltinDistribution::from_config(&config.builtin)?,
        })
    }

    /// Instances that last checked in at or before the returned instant are
    /// inactive.
    #[must_use]
    pub fn active_since(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(duration_millis(self.instance_validity))
    }
}
