//! Metric instrument helpers
//!
//! Thin wrappers over `prometheus` counters that route every increment
//! through the shared [`CounterPolicy`], keyed by the series identity.

use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Counter, CounterVec, Gauge, GaugeVec, Opts};

use super::counter_mode::CounterPolicy;

/// Label name used by every labeled WiredTiger family
pub const TYPE_LABEL: &str = "type";

/// Build options for `<namespace>_<subsystem>_<name>`
pub fn metric_opts(namespace: &str, subsystem: &str, name: &str, help: &str) -> Opts {
    Opts::new(name, help)
        .namespace(namespace)
        .subsystem(subsystem)
}

/// Counter family with a single `type` label
#[derive(Clone)]
pub struct LabeledCounter {
    vec: CounterVec,
    fq_name: String,
    policy: Arc<CounterPolicy>,
}

impl LabeledCounter {
    pub fn new(opts: Opts, policy: Arc<CounterPolicy>) -> prometheus::Result<Self> {
        let fq_name = opts.fq_name();
        let vec = CounterVec::new(opts, &[TYPE_LABEL])?;
        Ok(Self {
            vec,
            fq_name,
            policy,
        })
    }

    /// Add the policy increment for the reported total under `label`
    pub fn add(&self, label: &str, reported: f64) {
        let inc = self
            .policy
            .increment_with(|| format!("{}{{{}}}", self.fq_name, label), reported);
        self.vec.with_label_values(&[label]).inc_by(inc);
    }

    /// Current value under `label`; `None` if never exported
    pub fn get(&self, label: &str) -> Option<f64> {
        labeled_value(&self.vec, label)
    }

    pub fn collector(&self) -> &dyn Collector {
        &self.vec
    }
}

/// Unlabeled counter
#[derive(Clone)]
pub struct ScalarCounter {
    counter: Counter,
    fq_name: String,
    policy: Arc<CounterPolicy>,
}

impl ScalarCounter {
    pub fn new(opts: Opts, policy: Arc<CounterPolicy>) -> prometheus::Result<Self> {
        let fq_name = opts.fq_name();
        let counter = Counter::with_opts(opts)?;
        Ok(Self {
            counter,
            fq_name,
            policy,
        })
    }

    pub fn add(&self, reported: f64) {
        let inc = self.policy.increment(&self.fq_name, reported);
        self.counter.inc_by(inc);
    }

    pub fn get(&self) -> f64 {
        self.counter.get()
    }

    pub fn collector(&self) -> &dyn Collector {
        &self.counter
    }
}

/// Gauge family with a single `type` label
pub fn labeled_gauge(opts: Opts) -> prometheus::Result<GaugeVec> {
    GaugeVec::new(opts, &[TYPE_LABEL])
}

/// Unlabeled gauge
pub fn scalar_gauge(opts: Opts) -> prometheus::Result<Gauge> {
    Gauge::with_opts(opts)
}

/// Value of the series whose label equals `value`, without creating it
pub fn labeled_value(collector: &dyn Collector, value: &str) -> Option<f64> {
    let families = collector.collect();
    let metric = families
        .iter()
        .flat_map(|mf| mf.get_metric())
        .find(|m| m.get_label().iter().any(|l| l.get_value() == value))?;

    if metric.has_counter() {
        Some(metric.get_counter().get_value())
    } else {
        Some(metric.get_gauge().get_value())
    }
}

/// Descriptors of a set of collectors, in order
pub fn describe_all<'a>(collectors: &[&'a dyn Collector]) -> Vec<&'a Desc> {
    collectors.iter().copied().flat_map(|c| c.desc()).collect()
}

/// Current samples of a set of collectors, in order
pub fn collect_all(collectors: &[&dyn Collector]) -> Vec<MetricFamily> {
    collectors.iter().copied().flat_map(|c| c.collect()).collect()
}

/// Number of series a collector currently holds
pub fn series_count(collector: &dyn Collector) -> usize {
    collector
        .collect()
        .iter()
        .map(|mf| mf.get_metric().len())
        .sum()
}
