//! Pump relay drivers.
//!
//! The dispense worker is the only caller: it owns its actuator outright, so
//! implementations never have to guard against concurrent toggles.

use crate::types::Channel;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ActuationError {
    #[error("channel {channel}: {source}")]
    Io {
        channel: Channel,
        #[source]
        source: std::io::Error,
    },

    #[error("channel {0} rejected by driver: {1}")]
    Rejected(Channel, String),

    #[error("channel {0}: driver panicked: {1}")]
    Panicked(Channel, String),
}

/// Switch pump relays on and off.
pub trait Actuator: Send + 'static {
    /// Drive every listed channel to its "off" level. Called once at startup.
    fn prepare(&mut self, channels: &[Channel]) -> Result<(), ActuationError> {
        for channel in channels {
            self.deactivate(*channel)?;
        }
        Ok(())
    }

    fn activate(&mut self, channel: Channel) -> Result<(), ActuationError>;

    fn deactivate(&mut self, channel: Channel) -> Result<(), ActuationError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn prepare(&mut self, channels: &[Channel]) -> Result<(), ActuationError> {
        (**self).prepare(channels)
    }

    fn activate(&mut self, channel: Channel) -> Result<(), ActuationError> {
        (**self).activate(channel)
    }

    fn deactivate(&mut self, channel: Channel) -> Result<(), ActuationError> {
        (**self).deactivate(channel)
    }
}

// ---------------------------------------------------------------------------
// DryRunActuator
// ---------------------------------------------------------------------------

/// Logs toggles instead of touching hardware.
#[derive(Debug, Default)]
pub struct DryRunActuator;

impl Actuator for DryRunActuator {
    fn prepare(&mut self, channels: &[Channel]) -> Result<(), ActuationError> {
        info!(channels = channels.len(), "dry-run actuator ready");
        Ok(())
    }

    fn activate(&mut self, channel: Channel) -> Result<(), ActuationError> {
        info!(channel = %channel, "dry-run: relay on");
        Ok(())
    }

    fn deactivate(&mut self, channel: Channel) -> Result<(), ActuationError> {
        info!(channel = %channel, "dry-run: relay off");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SysfsGpio
// ---------------------------------------------------------------------------

pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Linux sysfs GPIO driver.
///
/// Lines are exported and switched to output on first use (or in
/// [`Actuator::prepare`]). Most relay boards close on a LOW level, hence the
/// `active_low` default. Dropping the driver switches every line it touched
/// back off.
#[derive(Debug)]
pub struct SysfsGpio {
    root: PathBuf,
    active_low: bool,
    configured: BTreeSet<Channel>,
}

impl SysfsGpio {
    pub fn new(root: impl Into<PathBuf>, active_low: bool) -> Self {
        Self {
            root: root.into(),
            active_low,
            configured: BTreeSet::new(),
        }
    }

    fn line_dir(&self, channel: Channel) -> PathBuf {
        self.root.join(format!("gpio{}", channel.0))
    }

    fn off_level(&self) -> &'static str {
        if self.active_low {
            "1"
        } else {
            "0"
        }
    }

    fn on_level(&self) -> &'static str {
        if self.active_low {
            "0"
        } else {
            "1"
        }
    }

    fn setup(&mut self, channel: Channel) -> Result<(), ActuationError> {
        if self.configured.contains(&channel) {
            return Ok(());
        }
        let dir = self.line_dir(channel);
        if !dir.exists() {
            write(&self.root.join("export"), &channel.0.to_string(), channel)?;
        }
        // "high"/"low" set the direction and the initial level in one write,
        // so the relay never glitches on while being configured.
        let direction = if self.active_low { "high" } else { "low" };
        write(&dir.join("direction"), direction, channel)?;
        debug!(channel = %channel, direction, "gpio line configured");
        self.configured.insert(channel);
        Ok(())
    }

    fn set(&mut self, channel: Channel, level: &str) -> Result<(), ActuationError> {
        self.setup(channel)?;
        write(&self.line_dir(channel).join("value"), level, channel)
    }
}

fn write(path: &Path, value: &str, channel: Channel) -> Result<(), ActuationError> {
    std::fs::write(path, value).map_err(|source| ActuationError::Io { channel, source })
}

impl Actuator for SysfsGpio {
    fn activate(&mut self, channel: Channel) -> Result<(), ActuationError> {
        let level = self.on_level();
        self.set(channel, level)
    }

    fn deactivate(&mut self, channel: Channel) -> Result<(), ActuationError> {
        let level = self.off_level();
        self.set(channel, level)
    }
}

impl Drop for SysfsGpio {
    fn drop(&mut self) {
        let level = self.off_level();
        for channel in self.configured.clone() {
            if let Err(e) = write(&self.line_dir(channel).join("value"), level, channel) {
                warn!(error = %e, "failed to switch relay off during shutdown");
            }
        }
    }
}
