use super::constants::{CPU_STATE_IDLE, CPU_STATE_MAX, CPU_STATE_NICE, CPU_STATE_SYSTEM, CPU_STATE_USER};

/// Cumulative scheduler ticks for one core
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreTicks {
    pub user: u64,
    pub system: u64,
    pub idle: u64,
    pub nice: u64,
}

impl CoreTicks {
    pub fn new(user: u64, system: u64, idle: u64, nice: u64) -> Self {
        Self { user, system, idle, nice }
    }

    pub fn busy(&self) -> u64 {
        self.user.saturating_add(self.system).saturating_add(self.nice)
    }

    pub fn total(&self) -> u64 {
        self.busy().saturating_add(self.idle)
    }
}

impl From<[u64; CPU_STATE_MAX]> for CoreTicks {
    fn from(states: [u64; CPU_STATE_MAX]) -> Self {
        Self {
            user: states[CPU_STATE_USER],
            system: states[CPU_STATE_SYSTEM],
            idle: states[CPU_STATE_IDLE],
            nice: states[CPU_STATE_NICE],
        }
    }
}

/// One tick snapshot per core, ordered by platform core index
pub type TickSnapshot = Vec<CoreTicks>;
