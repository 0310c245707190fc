//! Wake lock and reboot primitives

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use ota_errors::PlatformError;
use tracing::{debug, info};

use crate::process::{PlatformCommand, ProcessOperations};

#[async_trait]
pub trait PowerControl: Send + Sync {
    /// Keep the device awake while an update is in flight
    async fn acquire_wake_lock(&self) -> Result<(), PlatformError>;

    async fn release_wake_lock(&self) -> Result<(), PlatformError>;

    async fn reboot(&self) -> Result<(), PlatformError>;
}

/// Kernel wake lock through `/sys/power` and the `reboot` command
#[derive(Clone)]
pub struct SysfsPower {
    root: PathBuf,
    lock_name: String,
    process: Arc<dyn ProcessOperations>,
}

impl SysfsPower {
    pub const DEFAULT_ROOT: &'static str = "/sys/power";
    pub const DEFAULT_LOCK_NAME: &'static str = "ota_update";

    pub fn new(process: Arc<dyn ProcessOperations>) -> Self {
        Self::with_root(Self::DEFAULT_ROOT, process)
    }

    /// Use a different sysfs directory
    pub fn with_root(root: impl Into<PathBuf>, process: Arc<dyn ProcessOperations>) -> Self {
        Self {
            root: root.into(),
            lock_name: Self::DEFAULT_LOCK_NAME.to_string(),
            process,
        }
    }

    async fn write_node(&self, node: &str, operation: &str) -> Result<(), PlatformError> {
        let path = self.root.join(node);
        tokio::fs::write(&path, self.lock_name.as_bytes())
            .await
            .map_err(|e| PlatformError::PowerOperationFailed {
                operation: operation.to_string(),
                message: format!("{}: {e}", path.display()),
            })?;
        debug!(lock = %self.lock_name, node, "wrote wake lock node");
        Ok(())
    }
}

#[async_trait]
impl PowerControl for SysfsPower {
    async fn acquire_wake_lock(&self) -> Result<(), PlatformError> {
        self.write_node("wake_lock", "acquire_wake_lock").await
    }

    async fn release_wake_lock(&self) -> Result<(), PlatformError> {
        self.write_node("wake_unlock", "release_wake_lock").await
    }

    async fn reboot(&self) -> Result<(), PlatformError> {
        info!("rebooting device");
        let output = self
            .process
            .execute_command(PlatformCommand::new("reboot"))
            .await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(PlatformError::PowerOperationFailed {
                operation: "reboot".to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// For hosts without wake locks or reboot rights; every call succeeds
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPower;

#[async_trait]
impl PowerControl for NoopPower {
    async fn acquire_wake_lock(&self) -> Result<(), PlatformError> {
        debug!("wake lock not supported on this host");
        Ok(())
    }

    async fn release_wake_lock(&self) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn reboot(&self) -> Result<(), PlatformError> {
        info!("reboot requested; not supported on this host");
        Ok(())
    }
}
