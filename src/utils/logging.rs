//! Conditional logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! Modules that log on every tick define `const ENABLE_LOGS: bool = ...;`
//! and use these macros so hot-loop chatter can be silenced per module
//! without touching the global filter.

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}
