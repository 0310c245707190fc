//! Platform bundle handed to the orchestrator

use std::sync::Arc;

use crate::device::{DeviceIdentity, PropertyDevice, StaticDevice};
use crate::power::{NoopPower, PowerControl, SysfsPower};
use crate::process::{ProcessOperations, SystemProcess};

#[derive(Clone)]
pub struct Platform {
    device: Arc<dyn DeviceIdentity>,
    power: Arc<dyn PowerControl>,
}

impl Platform {
    pub fn new(device: Arc<dyn DeviceIdentity>, power: Arc<dyn PowerControl>) -> Self {
        Self { device, power }
    }

    /// Build the host platform. A configured product overrides the device
    /// properties, and then `build_time` (default zero) stands in for the
    /// build date property. `power_control` selects sysfs wake locks and a
    /// real reboot.
    #[must_use]
    pub fn current(
        product: Option<String>,
        build_time: Option<i64>,
        power_control: bool,
    ) -> Self {
        let process: Arc<dyn ProcessOperations> = Arc::new(SystemProcess);
        let device: Arc<dyn DeviceIdentity> = match product {
            Some(product) => {
                Arc::new(StaticDevice::new(product).with_build_time(build_time.unwrap_or(0)))
            }
            None => Arc::new(PropertyDevice::new(process.clone())),
        };
        let power: Arc<dyn PowerControl> = if power_control {
            Arc::new(SysfsPower::new(process))
        } else {
            Arc::new(NoopPower)
        };
        Self::new(device, power)
    }

    pub fn device(&self) -> &dyn DeviceIdentity {
        &*self.device
    }

    pub fn power(&self) -> &dyn PowerControl {
        &*self.power
    }
}
