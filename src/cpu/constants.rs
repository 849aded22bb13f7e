/// `host_processor_info` flavor returning per-core tick counters
pub const PROCESSOR_CPU_LOAD_INFO: i32 = 2;

/// Counters per core, in `CPU_STATE_*` order
pub const CPU_STATE_MAX: usize = 4;
pub const CPU_STATE_USER: usize = 0;
pub const CPU_STATE_SYSTEM: usize = 1;
pub const CPU_STATE_IDLE: usize = 2;
pub const CPU_STATE_NICE: usize = 3;
