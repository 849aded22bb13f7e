use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use darwin_telemetry::cpu::{CoreTicks, CpuTickSource, TickSnapshot};
use darwin_telemetry::provider::{SensorProvider, SensorReadings};

/// Raw source returning fixed readings and counting how often it is read
pub struct CountingProvider {
    readings: Mutex<Option<SensorReadings>>,
    reads: Arc<AtomicUsize>,
}

impl CountingProvider {
    pub fn new(pairs: &[(&str, f64)]) -> Self {
        let readings = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Self { readings: Mutex::new(Some(readings)), reads: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn absent() -> Self {
        Self { readings: Mutex::new(None), reads: Arc::new(AtomicUsize::new(0)) }
    }

    /// Replace what subsequent reads return
    pub fn set(&self, pairs: &[(&str, f64)]) {
        *self.readings.lock() = Some(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect());
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SensorProvider for CountingProvider {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn read(&self) -> Option<SensorReadings> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.readings.lock().clone()
    }
}

/// Tick source that advances every core by the same step on each snapshot
pub struct FixedTicks {
    cores: usize,
    busy_step: u64,
    idle_step: u64,
    taken: AtomicUsize,
}

impl FixedTicks {
    pub fn new(cores: usize, busy_step: u64, idle_step: u64) -> Self {
        Self { cores, busy_step, idle_step, taken: AtomicUsize::new(0) }
    }
}

impl CpuTickSource for FixedTicks {
    fn snapshot(&self) -> Option<TickSnapshot> {
        let n = self.taken.fetch_add(1, Ordering::SeqCst) as u64;
        Some(vec![CoreTicks::new(n * self.busy_step, 0, n * self.idle_step, 0); self.cores])
    }
}
