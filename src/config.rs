//! Runtime configuration for the paging core.
//!
//! The source this runtime is modeled on pins most of these as compile-time
//! constants; here they are fields on [`Config`] with the same defaults,
//! validated once at startup by [`Config::validate`].

use crate::error::{CoreError, Result};

/// Page size in bytes. Fixed — the cache, ring log and worker loop all key
/// off this value, and changing it is not a supported runtime option.
pub const PAGE_SIZE: usize = 4096;

/// Number of hash buckets in the page cache. Must be a power of two.
pub const HASH_SIZE: usize = 2048;

/// Number of shard-lock groups over the bucket array.
pub const MUTEX_GROUPS: usize = 16;

#[derive(Debug, Clone)]
pub struct Config {
    /// Number of worker threads ("pseudo-cores").
    pub cores: u32,
    /// Size in MiB of each worker's addressable segment of the backing file.
    pub segment_mb: u64,
    /// Size in MiB of the ring log's circular buffer.
    pub cache_mb: u64,
    /// Maximum number of live entries the page cache may hold.
    pub max_cache_entries: usize,
    /// `should_migrate` eligibility margin, in work-unit counts.
    pub migration_threshold: u32,
    /// Compression level used when the ratio heuristic judges data compressible.
    pub compression_min_lvl: u32,
    /// Compression level used when the ratio heuristic judges data poorly compressible.
    pub compression_max_lvl: u32,
    /// Ratio threshold (compressed/PAGE_SIZE) above which the next page is
    /// compressed at `compression_max_lvl`.
    pub compression_adaptive_threshold: f64,
    /// Path to the backing swap image.
    pub backing_path: String,
    /// Path the daemonised variant writes its pid to.
    pub pid_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cores: num_cpus::get() as u32,
            segment_mb: 64,
            cache_mb: 16,
            max_cache_entries: 4096,
            migration_threshold: 5,
            compression_min_lvl: 1,
            compression_max_lvl: 9,
            compression_adaptive_threshold: 0.8,
            backing_path: "./swap.img".to_string(),
            pid_file: "/var/run/pseudocored.pid".to_string(),
        }
    }
}

impl Config {
    pub fn segment_bytes(&self) -> u64 {
        self.segment_mb * 1024 * 1024
    }

    pub fn cache_bytes(&self) -> usize {
        (self.cache_mb * 1024 * 1024) as usize
    }

    /// Validates the constants that gate startup. A `ConfigError` here is
    /// fatal — the supervisor refuses to open the backing file or spawn
    /// workers until the configuration is sound.
    pub fn validate(&self) -> Result<()> {
        if self.cores == 0 {
            return Err(CoreError::ConfigError("cores must be >= 1".into()));
        }
        if PAGE_SIZE == 0 || !PAGE_SIZE.is_power_of_two() {
            return Err(CoreError::ConfigError(
                "PAGE_SIZE must be a nonzero power of two".into(),
            ));
        }
        if self.segment_bytes() % PAGE_SIZE as u64 != 0 {
            return Err(CoreError::ConfigError(
                "segment size must be a multiple of PAGE_SIZE".into(),
            ));
        }
        if self.cache_bytes() < PAGE_SIZE {
            return Err(CoreError::ConfigError(
                "cache_mb too small to hold a single page".into(),
            ));
        }
        if self.max_cache_entries == 0 {
            return Err(CoreError::ConfigError(
                "max_cache_entries must be >= 1".into(),
            ));
        }
        if self.compression_min_lvl == 0 || self.compression_min_lvl > 9 {
            return Err(CoreError::ConfigError(
                "compression_min_lvl must be in [1, 9]".into(),
            ));
        }
        if self.compression_max_lvl < self.compression_min_lvl || self.compression_max_lvl > 9 {
            return Err(CoreError::ConfigError(
                "compression_max_lvl must be in [compression_min_lvl, 9]".into(),
            ));
        }
        if self.backing_path.is_empty() {
            return Err(CoreError::ConfigError("backing_path must be set".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn zero_cores_is_rejected() {
        let mut cfg = Config::default();
        cfg.cores = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tiny_cache_is_rejected() {
        let mut cfg = Config::default();
        cfg.cache_mb = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_compression_levels_are_rejected() {
        let mut cfg = Config::default();
        cfg.compression_min_lvl = 9;
        cfg.compression_max_lvl = 1;
        assert!(cfg.validate().is_err());
    }
}
