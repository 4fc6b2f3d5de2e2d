//! Lifecycle timing and health reporting configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::handlers::subscription::HealthSettings;
use crate::domain::subscription::LifecyclePolicy;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// Days of entitlement kept after a failed renewal
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: i64,

    /// Days between cancellation and scheduled data deletion
    #[serde(default = "default_deletion_retention_days")]
    pub deletion_retention_days: i64,

    /// Deadline for one subscription write, in seconds
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,

    #[serde(default = "default_health_window_hours")]
    pub health_window_hours: u32,

    /// Success rate below which health reports `degraded`
    #[serde(default = "default_health_success_threshold")]
    pub health_success_threshold: f64,
}

impl LifecycleConfig {
    pub fn policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            grace_period_days: self.grace_period_days,
            deletion_retention_days: self.deletion_retention_days,
        }
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn health_settings(&self) -> HealthSettings {
        HealthSettings {
            default_window_hours: self.health_window_hours,
            success_threshold: self.health_success_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0..=365).contains(&self.grace_period_days) {
            return Err(ValidationError::InvalidGracePeriod);
        }
        if !(0..=3650).contains(&self.deletion_retention_days) {
            return Err(ValidationError::InvalidRetention);
        }
        if !(1..=120).contains(&self.write_timeout_secs) {
            return Err(ValidationError::InvalidWriteTimeout);
        }
        if !(1..=720).contains(&self.health_window_hours) {
            return Err(ValidationError::InvalidHealthWindow);
        }
        if !(0.0..=1.0).contains(&self.health_success_threshold) {
            return Err(ValidationError::InvalidSuccessThreshold);
        }
        Ok(())
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            grace_period_days: default_grace_period_days(),
            deletion_retention_days: default_deletion_retention_days(),
            write_timeout_secs: default_write_timeout(),
            health_window_hours: default_health_window_hours(),
            health_success_threshold: default_health_success_threshold(),
        }
    }
}

fn default_grace_period_days() -> i64 {
    30
}

fn default_deletion_retention_days() -> i64 {
    90
}

fn default_write_timeout() -> u64 {
    10
}

fn default_health_window_hours() -> u32 {
    24
}

fn default_health_success_threshold() -> f64 {
    0.95
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy_defaults() {
        let config = LifecycleConfig::default();
        assert_eq!(config.policy(), LifecyclePolicy::default());
        assert_eq!(config.write_timeout(), Duration::from_secs(10));
        assert_eq!(config.health_settings().default_window_hours, 24);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let cases = [
            (
                LifecycleConfig {
                    grace_period_days: -1,
                    ..Default::default()
                },
                ValidationError::InvalidGracePeriod,
            ),
            (
                LifecycleConfig {
                    deletion_retention_days: 5000,
                    ..Default::default()
                },
                ValidationError::InvalidRetention,
            ),
            (
                LifecycleConfig {
                    write_timeout_secs: 0,
                    ..Default::default()
                },
                ValidationError::InvalidWriteTimeout,
            ),
            (
                LifecycleConfig {
                    health_window_hours: 0,
                    ..Default::default()
                },
                ValidationError::InvalidHealthWindow,
            ),
            (
                LifecycleConfig {
                    health_success_threshold: 1.5,
                    ..Default::default()
                },
                ValidationError::InvalidSuccessThreshold,
            ),
        ];

        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }
}
