//! Counter increment policy
//!
//! The engine reports lifetime totals, not per-scrape deltas. Two policies
//! turn a reported total into a counter increment:
//! - `Cumulative` adds the full reported value every scrape. This is what
//!   existing dashboards are built against.
//! - `Delta` remembers the last total per series and adds only the growth.
//!   A total that went down means the engine restarted, and the new total
//!   is added as-is.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;

/// How a reported lifetime total becomes a counter increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterMode {
    /// Re-add the reported total each scrape
    #[default]
    Cumulative,
    /// Add the growth since the previous scrape
    Delta,
}

impl fmt::Display for CounterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterMode::Cumulative => write!(f, "cumulative"),
            CounterMode::Delta => write!(f, "delta"),
        }
    }
}

impl FromStr for CounterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cumulative" => Ok(CounterMode::Cumulative),
            "delta" => Ok(CounterMode::Delta),
            other => Err(format!("unknown counter mode '{}'", other)),
        }
    }
}

/// Shared increment policy with per-series memory for delta mode
#[derive(Debug, Default)]
pub struct CounterPolicy {
    mode: CounterMode,
    previous: Mutex<HashMap<String, f64>>,
}

impl CounterPolicy {
    pub fn new(mode: CounterMode) -> Self {
        Self {
            mode,
            previous: Mutex::new(HashMap::new()),
        }
    }

    pub fn mode(&self) -> CounterMode {
        self.mode
    }

    /// Increment to apply for `series` given its newly reported total
    ///
    /// Always finite and non-negative.
    pub fn increment(&self, series: &str, reported: f64) -> f64 {
        self.increment_with(|| series.to_string(), reported)
    }

    /// Like [`increment`](Self::increment), but the series key is only
    /// built in delta mode
    pub fn increment_with<F>(&self, series: F, reported: f64) -> f64
    where
        F: FnOnce() -> String,
    {
        let reported = if reported.is_finite() && reported > 0.0 {
            reported
        } else {
            0.0
        };

        match self.mode {
            CounterMode::Cumulative => reported,
            CounterMode::Delta => {
                let mut previous = self.previous.lock();
                match previous.insert(series(), reported) {
                    Some(last) if reported >= last => reported - last,
                    // first sample, or the engine restarted
                    _ => reported,
                }
            }
        }
    }

    /// Number of series remembered for delta mode
    pub fn tracked_series(&self) -> usize {
        self.previous.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_cumulative_readds_total() {
        let policy = CounterPolicy::new(CounterMode::Cumulative);
        assert_eq!(policy.increment("a", 10.0), 10.0);
        assert_eq!(policy.increment("a", 10.0), 10.0);
        assert_eq!(policy.tracked_series(), 0);
    }

    #[test]
    fn test_delta_adds_growth() {
        let policy = CounterPolicy::new(CounterMode::Delta);
        assert_eq!(policy.increment("a", 10.0), 10.0);
        assert_eq!(policy.increment("a", 15.0), 5.0);
        assert_eq!(policy.increment("a", 15.0), 0.0);
        assert_eq!(policy.increment("b", 3.0), 3.0);
        assert_eq!(policy.tracked_series(), 2);
    }

    #[test]
    fn test_delta_after_restart() {
        let policy = CounterPolicy::new(CounterMode::Delta);
        policy.increment("a", 100.0);
        assert_eq!(policy.increment("a", 4.0), 4.0);
        assert_eq!(policy.increment("a", 6.0), 2.0);
    }

    #[test]
    fn test_cumulative_skips_series_key() {
        let policy = CounterPolicy::new(CounterMode::Cumulative);
        let built = Cell::new(0);
        let key = || {
            built.set(built.get() + 1);
            "a".to_string()
        };
        assert_eq!(policy.increment_with(key, 7.0), 7.0);
        assert_eq!(built.get(), 0);

        let policy = CounterPolicy::new(CounterMode::Delta);
        let key = || {
            built.set(built.get() + 1);
            "a".to_string()
        };
        assert_eq!(policy.increment_with(key, 7.0), 7.0);
        assert_eq!(built.get(), 1);
    }

    #[test]
    fn test_never_negative() {
        for mode in [CounterMode::Cumulative, CounterMode::Delta] {
            let policy = CounterPolicy::new(mode);
            assert_eq!(policy.increment("a", -5.0), 0.0);
            assert_eq!(policy.increment("a", f64::NAN), 0.0);
            assert_eq!(policy.increment("a", f64::INFINITY), 0.0);
        }
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("delta".parse::<CounterMode>(), Ok(CounterMode::Delta));
        assert_eq!("Cumulative".parse::<CounterMode>(), Ok(CounterMode::Cumulative));
        assert!("rate".parse::<CounterMode>().is_err());
        assert_eq!(CounterMode::default().to_string(), "cumulative");
    }
}
