mod fixed;
mod gpsd;

pub use fixed::FixedSource;
pub use gpsd::GpsdSource;

use crate::common::Coordinates;
use crate::core::config::{LocationConfig, LocationSource};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    Lowest,
    Low,
    Balanced,
    #[default]
    High,
    Highest,
    BestForNavigation,
}

impl Accuracy {
    /// Minimum gpsd fix mode (2 = 2D, 3 = 3D) accepted at this accuracy.
    pub fn min_fix_mode(&self) -> u8 {
        if *self >= Accuracy::High { 3 } else { 2 }
    }
}

/// Parameters of a single position sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub accuracy: Accuracy,
    pub timeout: Duration,
    /// A cached reading no older than this may be returned.
    pub max_age: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionStatus {
    pub foreground: bool,
    pub background: bool,
}

impl PermissionStatus {
    pub fn granted() -> Self {
        Self {
            foreground: true,
            background: true,
        }
    }

    pub fn is_granted(&self) -> bool {
        self.foreground && self.background
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permissions(&self) -> Result<PermissionStatus>;

    async fn current_position(&self, request: &PositionRequest) -> Result<Coordinates>;
}

pub fn create_location_provider(cfg: &LocationConfig) -> Arc<dyn LocationProvider> {
    let permissions = PermissionStatus {
        foreground: cfg.allow_foreground,
        background: cfg.allow_background,
    };
    match cfg.source {
        LocationSource::Gpsd => Arc::new(GpsdSource::new(cfg.gpsd_addr.clone(), permissions)),
        LocationSource::Fixed => Arc::new(FixedSource::new(
            Coordinates::new(cfg.fixed_latitude, cfg.fixed_longitude),
            permissions,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_fix_mode() {
        assert_eq!(Accuracy::Lowest.min_fix_mode(), 2);
        assert_eq!(Accuracy::Balanced.min_fix_mode(), 2);
        assert_eq!(Accuracy::High.min_fix_mode(), 3);
        assert_eq!(Accuracy::BestForNavigation.min_fix_mode(), 3);
    }

    #[test]
    fn test_permission_requires_both() {
        assert!(PermissionStatus::granted().is_granted());
        let fg_only = PermissionStatus {
            foreground: true,
            background: false,
        };
        assert!(!fg_only.is_granted());
        assert!(!PermissionStatus::default().is_granted());
    }

    #[tokio::test]
    async fn test_create_fixed_provider() {
        let cfg = LocationConfig {
            source: LocationSource::Fixed,
            fixed_latitude: 48.8584,
            fixed_longitude: 2.2945,
            allow_background: false,
            ..Default::default()
        };
        let provider = create_location_provider(&cfg);
        let req = PositionRequest {
            accuracy: Accuracy::High,
            timeout: Duration::from_secs(30),
            max_age: Duration::from_secs(10),
        };
        let pos = provider.current_position(&req).await.unwrap();
        assert_eq!(pos, Coordinates::new(48.8584, 2.2945));

        let perms = provider.request_permissions().await.unwrap();
        assert!(perms.foreground);
        assert!(!perms.background);
    }
}
