use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sync::{
    AdaptiveThresholds, BusyPolicy, DISPATCH_INTERVAL_MS, HISTORY_LIMIT, PROGRESS_MAX_AGE_SECS,
};

/// Engine-wide tunables.
///
/// Deserializes from partial input; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Results kept per configuration, oldest evicted first.
    pub history_limit: usize,
    /// Pause between dispatcher iterations.
    pub dispatch_interval_ms: u64,
    /// Progress records older than this are swept.
    pub progress_max_age_secs: u64,
    /// What the dispatcher does with an entry whose configuration is busy.
    pub busy_policy: BusyPolicy,
    pub adaptive: AdaptiveThresholds,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            history_limit: HISTORY_LIMIT,
            dispatch_interval_ms: DISPATCH_INTERVAL_MS,
            progress_max_age_secs: PROGRESS_MAX_AGE_SECS,
            busy_policy: BusyPolicy::default(),
            adaptive: AdaptiveThresholds::default(),
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }

    #[must_use]
    pub fn progress_max_age(&self) -> Duration {
        Duration::from_secs(self.progress_max_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.history_limit, 50);
        assert_eq!(options.dispatch_interval(), Duration::from_secs(1));
        assert_eq!(options.progress_max_age(), Duration::from_secs(3_600));
        assert_eq!(options.busy_policy, BusyPolicy::Drop);
        assert_eq!(options.adaptive.scale_up_per_minute, 30.0);
    }

    #[test]
    fn test_partial_input_keeps_defaults() {
        let options: EngineOptions = serde_json::from_str(
            r#"{ "busy_policy": "requeue", "adaptive": { "scale_up_per_minute": 60.0 } }"#,
        )
        .unwrap();

        assert_eq!(options.busy_policy, BusyPolicy::Requeue);
        assert_eq!(options.adaptive.scale_up_per_minute, 60.0);
        assert_eq!(options.adaptive.scale_down_per_minute, 10.0);
        assert_eq!(options.history_limit, 50);
    }
}
