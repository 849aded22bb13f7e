//! `powermetrics` fallback source
//!
//! Needs root, so it is expected to fail on most machines. Invocations are
//! rate limited process-wide; between runs the last good result is served.

use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

use crate::cache::ValueCache;
use crate::provider::{SensorProvider, SensorReadings};

/// Minimum spacing between two `powermetrics` runs in this process
pub const THROTTLE_INTERVAL: Duration = Duration::from_secs(5);

const POWERMETRICS_ARGS: [&str; 6] = ["-n", "1", "-i", "100", "--samplers", "smc"];

static TEMPERATURE_LINE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(.+?) temperature:\s*(-?\d+(?:\.\d+)?)\s*C\s*$").ok());
static FAN_LINE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?m)^\s*Fan:\s*(\d+(?:\.\d+)?)\s*rpm\s*$").ok());

static PROCESS_GATE: Lazy<Arc<InvocationGate>> = Lazy::new(|| Arc::new(InvocationGate::new(THROTTLE_INTERVAL)));

/// Admits at most one caller per `interval`
#[derive(Debug)]
pub struct InvocationGate {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl InvocationGate {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: Mutex::new(None) }
    }

    /// The gate shared by every source in this process
    pub fn process_wide() -> Arc<Self> {
        PROCESS_GATE.clone()
    }

    pub fn try_acquire(&self, now: Instant) -> bool {
        let mut last = self.last.lock();
        match *last {
            Some(at) if now.saturating_duration_since(at) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            },
        }
    }
}

/// Extract temperature and fan lines from `powermetrics --samplers smc` output
pub fn parse_output(output: &str) -> SensorReadings {
    let mut readings = SensorReadings::new();
    let (Some(temperature_line), Some(fan_line)) = (TEMPERATURE_LINE.as_ref(), FAN_LINE.as_ref()) else {
        return readings;
    };
    for captures in temperature_line.captures_iter(output) {
        if let Ok(value) = captures[2].parse::<f64>() {
            readings.insert(captures[1].trim().to_string(), value);
        }
    }
    for (index, captures) in fan_line.captures_iter(output).enumerate() {
        if let Ok(value) = captures[1].parse::<f64>() {
            let key = if index == 0 { "Fan".to_string() } else { format!("Fan {}", index + 1) };
            readings.insert(key, value);
        }
    }
    readings
}

fn run_powermetrics() -> Option<String> {
    let output = match Command::new("powermetrics").args(POWERMETRICS_ARGS).output() {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(error = %e, "powermetrics not runnable");
            return None;
        },
    };
    if !output.status.success() {
        tracing::debug!(status = %output.status, "powermetrics failed");
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

type Runner = Box<dyn Fn() -> Option<String> + Send + Sync>;

pub struct PowermetricsSource {
    runner: Runner,
    gate: Arc<InvocationGate>,
    last_result: ValueCache<(), SensorReadings>,
}

impl PowermetricsSource {
    pub fn new() -> Self {
        Self::with_runner(Box::new(run_powermetrics), InvocationGate::process_wide())
    }

    /// Use `runner` in place of spawning the real binary
    pub fn with_runner(runner: Runner, gate: Arc<InvocationGate>) -> Self {
        let hold = gate.interval * 2;
        Self { runner, gate, last_result: ValueCache::new(hold) }
    }
}

impl Default for PowermetricsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorProvider for PowermetricsSource {
    fn name(&self) -> &'static str {
        "powermetrics"
    }

    fn read(&self) -> Option<SensorReadings> {
        let now = Instant::now();
        if !self.gate.try_acquire(now) {
            return self.last_result.get(&(), now);
        }

        let readings = parse_output(&(self.runner)()?);
        if readings.is_empty() {
            return None;
        }
        self.last_result.set((), readings.clone(), now);
        Some(readings)
    }
}
