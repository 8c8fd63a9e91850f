pub mod rates;
pub mod snapshot;

/// Default HTTP/WebSocket listen port
pub const DEFAULT_PORT: u16 = 8000;

/// Default broadcast cadence
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Bytes per megabyte, used for GPU memory figures
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
