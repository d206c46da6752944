//! Exporter registry
//!
//! Owns the `prometheus::Registry` and every instrument family. Built once
//! at startup; exporters hold clones of the instruments, which share state
//! with what the registry gathers.

use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::debug;

use super::changelog::ChangelogMetrics;
use super::counter_mode::{CounterMode, CounterPolicy};
use super::wiredtiger::WiredTigerMetrics;
use crate::utils::Result;

pub struct ExporterRegistry {
    registry: Registry,
    policy: Arc<CounterPolicy>,
    wiredtiger: WiredTigerMetrics,
    changelog: ChangelogMetrics,
}

impl ExporterRegistry {
    /// Create and register every instrument under `namespace`
    pub fn new(namespace: &str, counter_mode: CounterMode) -> Result<Self> {
        let registry = Registry::new();
        let policy = Arc::new(CounterPolicy::new(counter_mode));

        let wiredtiger = WiredTigerMetrics::new(namespace, Arc::clone(&policy))?;
        registry.register(Box::new(wiredtiger.clone()))?;

        let changelog = ChangelogMetrics::new(namespace)?;
        registry.register(Box::new(changelog.clone()))?;

        debug!(
            "Registered metrics under namespace '{}' (counter mode: {})",
            namespace, counter_mode
        );

        Ok(Self {
            registry,
            policy,
            wiredtiger,
            changelog,
        })
    }

    pub fn wiredtiger(&self) -> &WiredTigerMetrics {
        &self.wiredtiger
    }

    pub fn changelog(&self) -> &ChangelogMetrics {
        &self.changelog
    }

    pub fn counter_mode(&self) -> CounterMode {
        self.policy.mode()
    }

    /// Descriptors of every registered family
    pub fn describe(&self) -> Vec<Desc> {
        let mut descs: Vec<Desc> = self.wiredtiger.desc().into_iter().cloned().collect();
        descs.extend(self.changelog.desc().into_iter().cloned());
        descs
    }

    /// Current samples; families without any series are omitted
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Prometheus text exposition of the current samples
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
