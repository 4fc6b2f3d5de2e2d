//! GetProcessingHealthHandler - Query handler for notification processing health.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::notification::HealthReport;
use crate::ports::NotificationLog;

/// Longest window a caller may ask for, 30 days.
pub const MAX_WINDOW_HOURS: u32 = 720;

/// Query for processing health over the trailing window.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetProcessingHealthQuery {
    /// Window length in hours. `None` uses the configured default.
    pub window_hours: Option<u32>,
}

pub type GetProcessingHealthResult = HealthReport;

/// Health report settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthSettings {
    pub default_window_hours: u32,

    /// Success rate below which the report is degraded.
    pub success_threshold: f64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            default_window_hours: 24,
            success_threshold: 0.95,
        }
    }
}

/// Handler for the processing health report.
///
/// Reads only the audit log.
pub struct GetProcessingHealthHandler {
    log: Arc<dyn NotificationLog>,
    settings: HealthSettings,
}

impl GetProcessingHealthHandler {
    pub fn new(log: Arc<dyn NotificationLog>, settings: HealthSettings) -> Self {
        Self { log, settings }
    }

    pub async fn handle(
        &self,
        query: GetProcessingHealthQuery,
    ) -> Result<GetProcessingHealthResult, DomainError> {
        let window_hours = query
            .window_hours
            .unwrap_or(self.settings.default_window_hours)
            .clamp(1, MAX_WINDOW_HOURS);

        let since = Timestamp::now().minus_hours(i64::from(window_hours));
        let summary = self.log.summarize_since(since).await?;

        Ok(HealthReport::from_summary(
            window_hours,
            summary,
            self.settings.success_threshold,
        ))
    }
}
