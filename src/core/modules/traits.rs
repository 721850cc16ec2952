use std::{sync::Arc, time::Duration};

use tracing::{trace, warn};

use super::types::{ModuleResult, Render};
use crate::{
    config::status::ModuleConfig,
    core::{signal::UpdateSignal, slot::OutputSlot},
};

/// A producer owning one output slot.
///
/// `run` is spawned once as its own task and decides for itself when to
/// publish: on a timer, on a filesystem notification, or whenever a
/// subprocess prints a line. Transient data source failures should be logged
/// and retried inside `run`.
///
/// Returning `Err` is a structural failure and terminates the process.
/// Returning `Ok` means the producer has nothing left to do; its last render
/// stays in the slot.
#[async_trait::async_trait]
pub trait Module: Send + 'static {
    async fn run(&mut self, handle: ModuleHandle) -> ModuleResult<()>;
}

/// Construction of a module from its configuration entry.
///
/// Errors returned here are startup failures.
pub trait FromConfig: Sized {
    fn from_config(config: &ModuleConfig) -> ModuleResult<Self>;
}

/// Interval-driven data source, run by [`Periodic`].
#[async_trait::async_trait]
pub trait Sampler: Send + 'static {
    /// Sampling interval used when the configuration does not set one.
    const DEFAULT_INTERVAL_SECS: u64;

    /// Reads the data source once and renders it.
    async fn sample(&mut self) -> ModuleResult<Render>;
}

/// The only way a producer mutates its externally visible state.
///
/// Publishing overwrites the slot's text and visibility under the slot lock,
/// releases the lock, then marks the status line dirty.
#[derive(Debug, Clone)]
pub struct ModuleHandle {
    slot: Arc<OutputSlot>,
    signal: UpdateSignal,
}

impl ModuleHandle {
    pub fn new(slot: Arc<OutputSlot>, signal: UpdateSignal) -> Self {
        Self { slot, signal }
    }

    pub fn name(&self) -> &str {
        self.slot.name()
    }

    pub fn publish(&self, text: &str, visible: bool) {
        if self.slot.write(text, visible) {
            trace!(
                "Module '{}' output truncated to {} bytes",
                self.slot.name(),
                self.slot.capacity()
            );
        }
        self.signal.notify();
    }

    pub fn render(&self, render: &Render) {
        self.publish(&render.text, render.visible);
    }

    pub fn hide(&self) {
        self.publish("", false);
    }
}

/// Runs a [`Sampler`] on a fixed interval and publishes only renders that
/// differ from the previous one.
///
/// A failed sample is logged, published once as hidden, and retried on the
/// next tick.
pub struct Periodic<S> {
    sampler: S,
    interval: Duration,
    last: Option<Render>,
}

impl<S: Sampler> Periodic<S> {
    pub fn new(sampler: S, interval: Duration) -> Self {
        Self {
            sampler,
            interval,
            last: None,
        }
    }

    /// Samples once and publishes if the render changed.
    pub async fn tick(&mut self, handle: &ModuleHandle) {
        let render = match self.sampler.sample().await {
            Ok(render) => render,
            Err(e) => {
                warn!("Module '{}' failed to sample: {}", handle.name(), e);
                Render::hidden()
            }
        };

        if self.last.as_ref() != Some(&render) {
            handle.render(&render);
            self.last = Some(render);
        }
    }
}

impl<S: Sampler + FromConfig> FromConfig for Periodic<S> {
    fn from_config(config: &ModuleConfig) -> ModuleResult<Self> {
        Ok(Periodic::new(
            S::from_config(config)?,
            config.interval_or(S::DEFAULT_INTERVAL_SECS),
        ))
    }
}

#[async_trait::async_trait]
impl<S: Sampler> Module for Periodic<S> {
    async fn run(&mut self, handle: ModuleHandle) -> ModuleResult<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick(&handle).await;
        }
    }
}
