//! Processing health derived from the audit log.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Audit totals over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessingSummary {
    pub total: u64,
    pub failed: u64,
    pub last_received_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Monitoring view of recent notification processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub window_hours: u32,
    pub total_notifications: u64,
    pub failed_notifications: u64,

    /// Fraction of successful records in `0.0..=1.0`. An empty window is 1.0.
    pub success_rate: f64,

    pub last_notification_at: Option<Timestamp>,
    pub status: HealthStatus,
}

impl HealthReport {
    /// Builds a report, degraded when the success rate is below `threshold`.
    pub fn from_summary(window_hours: u32, summary: ProcessingSummary, threshold: f64) -> Self {
        let success_rate = if summary.total == 0 {
            1.0
        } else {
            let succeeded = summary.total.saturating_sub(summary.failed);
            succeeded as f64 / summary.total as f64
        };

        let status = if success_rate < threshold {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            window_hours,
            total_notifications: summary.total,
            failed_notifications: summary.failed,
            success_rate,
            last_notification_at: summary.last_received_at,
            status,
        }
    }
}
