//! CLI command implementations

pub mod config;
pub mod list;
pub mod purge;
pub mod status;

pub use config::execute as config;
pub use list::execute as list;
pub use purge::execute as purge;
pub use status::execute as status;

use crate::cache::CacheLayout;
use crate::config::{Config, ConfigManager};

/// Layout for the configured cache root
pub(crate) fn layout_for(config: &Config) -> CacheLayout {
    CacheLayout::new(&ConfigManager::cache_root(config), &config.cache)
}

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
