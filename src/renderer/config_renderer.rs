/// Thread group dimensions the raytracing kernel is compiled with
pub const DEFAULT_THREAD_GROUP_SIZE: [u32; 3] = [8, 8, 1];

/// 1 second
pub const TIMEOUT_NANOSECS: u64 = 1_000_000_000;
