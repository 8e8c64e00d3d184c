use anyhow::Context;
use barkeep_core::actuator::{Actuator, DryRunActuator, SysfsGpio};
use barkeep_core::types::Channel;
use barkeep_core::Dispatcher;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Driver {
    /// Log relay toggles without touching hardware
    DryRun,
    /// Linux sysfs GPIO
    Sysfs,
}

pub struct ServeOptions {
    pub port: u16,
    pub bind: IpAddr,
    pub driver: Driver,
    pub gpio_root: PathBuf,
    pub active_low: bool,
}

pub fn run(config: &Path, opts: ServeOptions) -> anyhow::Result<()> {
    // A broken config at startup is fatal; later it only fails requests.
    let snapshot = super::load(config)?;
    for w in snapshot.validate() {
        tracing::warn!("config: {}", w.message);
    }
    let channels = snapshot.channels();

    let rt = tokio::runtime::Runtime::new()?;
    let config_buf = config.to_path_buf();

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind((opts.bind, opts.port))
            .await
            .with_context(|| format!("failed to bind {}:{}", opts.bind, opts.port))?;

        let dispatcher = match opts.driver {
            Driver::DryRun => start(DryRunActuator, &channels)?,
            Driver::Sysfs => start(SysfsGpio::new(&opts.gpio_root, opts.active_low), &channels)?,
        };

        println!(
            "barkeep serving {} on http://{}  ({} pumps, {} recipes, {:?} driver)",
            config_buf.display(),
            listener.local_addr()?,
            snapshot.pumps.len(),
            snapshot.recipes.len(),
            opts.driver,
        );

        tokio::select! {
            res = barkeep_server::serve_on(config_buf, dispatcher, listener) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                Ok(())
            }
        }
    })
}

/// Drive every configured line off, then hand the actuator to the worker.
fn start<A: Actuator>(mut actuator: A, channels: &[Channel]) -> anyhow::Result<Dispatcher> {
    actuator
        .prepare(channels)
        .context("failed to prepare pump relays")?;
    Ok(Dispatcher::start(actuator))
}
