// Tile Configs
pub const DEFAULT_EXTENT: u32 = 4096;

// Style Configs
pub const DEFAULT_MIN_ZOOM: u32 = 0;
pub const DEFAULT_MAX_ZOOM: u32 = 22;
pub const DEFAULT_SOURCE_TYPE: &str = "vector";

// Tolerance used when a float is compared against another numeric value.
pub const NUMERIC_EPSILON: f64 = 0.01;

// Decode Configs
pub const DECODE_WORKER_COUNT: usize = 4;
