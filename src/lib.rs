pub mod cli;
pub mod commands;
pub mod hints;
pub mod inventory;
mod logging;
pub mod raid;
pub mod validation;

pub use hints::{DeviceHintMatcher, HintMatcher};
pub use logging::{file_log::FileLogger, multilog::MultiLogger};
pub use raid::{resolve_block_devices, RaidResolution, ResolvedLogicalDisk};

/// Raidplan version as provided by environment variables at build time
pub const RAIDPLAN_VERSION: &str = env!("CARGO_PKG_VERSION");
