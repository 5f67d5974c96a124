use super::{LocationProvider, PermissionStatus, PositionRequest};
use crate::common::Coordinates;
use anyhow::Result;
use async_trait::async_trait;

/// Always reports the same configured position.
pub struct FixedSource {
    position: Coordinates,
    permissions: PermissionStatus,
}

impl FixedSource {
    pub fn new(position: Coordinates, permissions: PermissionStatus) -> Self {
        Self {
            position,
            permissions,
        }
    }
}

#[async_trait]
impl LocationProvider for FixedSource {
    async fn request_permissions(&self) -> Result<PermissionStatus> {
        Ok(self.permissions)
    }

    async fn current_position(&self, _request: &PositionRequest) -> Result<Coordinates> {
        Ok(self.position)
    }
}
