pub mod entities;
pub mod stats_store;

#[cfg(test)]
pub mod memory;

/// Name of the store document inside the application directory.
pub const STATS_FILE_NAME: &str = "stats.json";
