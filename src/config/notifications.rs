//! Signed notification configuration

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::notification::Environment as PayloadEnvironment;

use super::error::ValidationError;

/// Which notifications this deployment accepts and which roots it trusts.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// App bundle identifier every payload must carry
    pub bundle_id: String,

    /// Billing environment, `sandbox` or `production`
    #[serde(default = "default_environment")]
    pub environment: PayloadEnvironment,

    /// Comma-separated PEM or DER root certificate paths
    pub root_certificates: String,
}

impl NotificationsConfig {
    pub fn root_certificate_paths(&self) -> Vec<PathBuf> {
        self.root_certificates
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let bundle_id = self.bundle_id.trim();
        if bundle_id.is_empty() {
            return Err(ValidationError::MissingRequired("NOTIFICATIONS__BUNDLE_ID"));
        }
        if bundle_id.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidBundleId(self.bundle_id.clone()));
        }
        if self.root_certificate_paths().is_empty() {
            return Err(ValidationError::MissingRequired(
                "NOTIFICATIONS__ROOT_CERTIFICATES",
            ));
        }
        Ok(())
    }
}

fn default_environment() -> PayloadEnvironment {
    PayloadEnvironment::Production
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(bundle_id: &str, roots: &str) -> NotificationsConfig {
        NotificationsConfig {
            bundle_id: bundle_id.to_string(),
            environment: default_environment(),
            root_certificates: roots.to_string(),
        }
    }

    #[test]
    fn test_root_paths_are_split_and_trimmed() {
        let paths = config("com.example.photos", " /etc/roots/g3.cer, ,/etc/roots/g2.pem ")
            .root_certificate_paths();
        assert_eq!(
            paths,
            vec![PathBuf::from("/etc/roots/g3.cer"), PathBuf::from("/etc/roots/g2.pem")]
        );
    }

    #[test]
    fn test_validation_requires_bundle_and_roots() {
        assert!(config("", "/r.pem").validate().is_err());
        assert!(config("com.example.photos", " , ").validate().is_err());
        assert!(config("com.example photos", "/r.pem").validate().is_err());
        assert!(config("com.example.photos", "/r.pem").validate().is_ok());
    }
}
