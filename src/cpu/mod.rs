//! Per-core CPU usage from cumulative scheduler ticks
//!
//! Usage is a ratio of tick deltas between two snapshots, so the first
//! sample after start only primes the tracker.
//!
//! ```rust
//! use darwin_telemetry::cpu::{compute_per_core_usage, CoreTicks};
//!
//! let previous = vec![CoreTicks::new(100, 50, 850, 0)];
//! let current = vec![CoreTicks::new(130, 60, 910, 0)];
//! assert_eq!(compute_per_core_usage(&previous, &current), vec![0.4]);
//! ```

mod constants;
mod types;


use parking_lot::Mutex;

pub use constants::*;
pub use types::*;

#[cfg(test)]
use mockall::automock;

/// Fraction of time each core spent busy between two snapshots.
///
/// Only the cores present in both snapshots are reported. Counters that went
/// backwards count as zero, and a core with no elapsed ticks reports `0.0`.
pub fn compute_per_core_usage(previous: &[CoreTicks], current: &[CoreTicks]) -> Vec<f64> {
    previous
        .iter()
        .zip(current)
        .map(|(prev, curr)| {
            let user = curr.user.saturating_sub(prev.user);
            let system = curr.system.saturating_sub(prev.system);
            let idle = curr.idle.saturating_sub(prev.idle);
            let nice = curr.nice.saturating_sub(prev.nice);

            let busy = user + system + nice;
            let total = busy + idle;
            if total == 0 {
                0.0
            } else {
                busy as f64 / total as f64
            }
        })
        .collect()
}

/// Source of cumulative per-core tick counters
#[cfg_attr(test, automock)]
pub trait CpuTickSource: Send + Sync {
    fn snapshot(&self) -> Option<TickSnapshot>;
}

/// Remembers the previous snapshot and turns each new one into usage
pub struct UsageTracker {
    source: Box<dyn CpuTickSource>,
    previous: Mutex<Option<TickSnapshot>>,
}

impl UsageTracker {
    pub fn new(source: Box<dyn CpuTickSource>) -> Self {
        Self { source, previous: Mutex::new(None) }
    }

    /// Usage since the last call; empty on the first call or when the source fails
    pub fn sample(&self) -> Vec<f64> {
        let Some(current) = self.source.snapshot() else {
            tracing::debug!("cpu tick snapshot unavailable");
            return Vec::new();
        };
        let mut previous = self.previous.lock();
        let usage = previous.as_deref().map(|prev| compute_per_core_usage(prev, &current)).unwrap_or_default();
        *previous = Some(current);
        usage
    }
}

/// `host_processor_info` backed tick source
#[derive(Debug, Default, Clone, Copy)]
pub struct HostProcessorTicks;

#[cfg(target_os = "macos")]
impl CpuTickSource for HostProcessorTicks {
    fn snapshot(&self) -> Option<TickSnapshot> {
        platform::host_processor_ticks()
    }
}

#[cfg(not(target_os = "macos"))]
impl CpuTickSource for HostProcessorTicks {
    fn snapshot(&self) -> Option<TickSnapshot> {
        None
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use std::os::raw::c_int;

    use super::constants::{CPU_STATE_MAX, PROCESSOR_CPU_LOAD_INFO};
    use super::types::{CoreTicks, TickSnapshot};

    type MachPort = u32;
    type KernReturn = c_int;

    extern "C" {
        static mach_task_self_: MachPort;

        fn mach_host_self() -> MachPort;
        fn host_processor_info(
            host: MachPort,
            flavor: c_int,
            out_processor_count: *mut u32,
            out_processor_info: *mut *mut c_int,
            out_processor_info_count: *mut u32,
        ) -> KernReturn;
        fn vm_deallocate(target_task: MachPort, address: usize, size: usize) -> KernReturn;
    }

    pub(super) fn host_processor_ticks() -> Option<TickSnapshot> {
        let mut processor_count: u32 = 0;
        let mut info: *mut c_int = std::ptr::null_mut();
        let mut info_count: u32 = 0;

        let result = unsafe {
            host_processor_info(
                mach_host_self(),
                PROCESSOR_CPU_LOAD_INFO,
                &mut processor_count,
                &mut info,
                &mut info_count,
            )
        };
        if result != 0 || info.is_null() {
            tracing::debug!(result, "host_processor_info failed");
            return None;
        }
        scopeguard::defer! {
            unsafe {
                vm_deallocate(mach_task_self_, info as usize, info_count as usize * std::mem::size_of::<c_int>());
            }
        }

        // Counters are unsigned 32-bit values that wrap
        let counters = unsafe { std::slice::from_raw_parts(info as *const u32, info_count as usize) };
        let snapshot = counters
            .chunks_exact(CPU_STATE_MAX)
            .take(processor_count as usize)
            .map(|states| CoreTicks::from([states[0], states[1], states[2], states[3]].map(u64::from)))
            .collect();
        Some(snapshot)
    }
}
