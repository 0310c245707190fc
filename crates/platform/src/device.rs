//! Device identity

use std::sync::Arc;

use async_trait::async_trait;
use ota_errors::PlatformError;
use tracing::debug;

use crate::process::{PlatformCommand, ProcessOperations};

/// System property holding the product identifier
pub const PRODUCT_DEVICE_PROPERTY: &str = "ro.product.device";

/// System property holding the build time in epoch seconds
pub const BUILD_DATE_PROPERTY: &str = "ro.build.date.utc";

/// Source of the identifier packages are matched against
#[async_trait]
pub trait DeviceIdentity: Send + Sync {
    /// The running device's product identifier
    async fn product(&self) -> Result<String, PlatformError>;

    /// When the running build was made, in seconds since the epoch. Only
    /// builds published after this are offered as updates.
    async fn build_time(&self) -> Result<i64, PlatformError>;
}

/// Fixed identifier, from configuration or tests
#[derive(Debug, Clone)]
pub struct StaticDevice {
    product: String,
    build_time: i64,
}

impl StaticDevice {
    /// Device with build time zero, so every published build is newer
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            build_time: 0,
        }
    }

    #[must_use]
    pub fn with_build_time(mut self, build_time: i64) -> Self {
        self.build_time = build_time;
        self
    }
}

#[async_trait]
impl DeviceIdentity for StaticDevice {
    async fn product(&self) -> Result<String, PlatformError> {
        Ok(self.product.clone())
    }

    async fn build_time(&self) -> Result<i64, PlatformError> {
        Ok(self.build_time)
    }
}

/// Reads the identifier with `getprop`
#[derive(Clone)]
pub struct PropertyDevice {
    process: Arc<dyn ProcessOperations>,
}

impl PropertyDevice {
    pub fn new(process: Arc<dyn ProcessOperations>) -> Self {
        Self { process }
    }

    async fn getprop(&self, property: &str) -> Result<String, PlatformError> {
        let mut cmd = PlatformCommand::new("getprop");
        cmd.arg(property);
        let output = self.process.execute_command(cmd).await?;

        let value = output.stdout_text();
        if !output.status.success() || value.is_empty() {
            return Err(PlatformError::PropertyUnavailable {
                property: property.to_string(),
            });
        }
        Ok(value)
    }
}

#[async_trait]
impl DeviceIdentity for PropertyDevice {
    async fn product(&self) -> Result<String, PlatformError> {
        let product = self.getprop(PRODUCT_DEVICE_PROPERTY).await?;
        debug!(product = %product, "read device product");
        Ok(product)
    }

    async fn build_time(&self) -> Result<i64, PlatformError> {
        let text = self.getprop(BUILD_DATE_PROPERTY).await?;
        text.parse().map_err(|_| PlatformError::PropertyUnavailable {
            property: BUILD_DATE_PROPERTY.to_string(),
        })
    }
}
