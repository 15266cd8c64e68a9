use crate::errors::{BfsError, BfsResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Block size of a freshly initialized configuration.
pub const DEFAULT_BLOCK_SIZE: u32 = 512;

pub const MIN_BLOCK_SIZE: u32 = 128;
pub const MAX_BLOCK_SIZE: u32 = 64 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogConfig {
    pub enabled: bool,
    pub file_path: String,
    pub level: String,
    /// Maximum log file size (bytes)
    pub max_size: u64,
    /// Log rotation count
    pub rotation_count: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_path: "/var/log/bfs/access.log".to_string(),
            level: "info".to_string(),
            max_size: 10 * 1024 * 1024, // 10MB
            rotation_count: 5,
        }
    }
}

impl LogConfig {
    /// Logging switched off, for tests and one-shot tools.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            file_path: String::new(),
            level: "warn".to_string(),
            max_size: 0,
            rotation_count: 0,
        }
    }
}

/// Disk geometry, fixed at format time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Bytes per block
    pub block_size: u32,
    /// Total blocks in the image, superblock included
    pub total_blocks: u32,
    /// Number of inodes (and therefore the maximum number of files)
    pub inode_count: u32,
    /// Capacity of the open-file table
    pub max_open_files: usize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            total_blocks: 2048, // 1MB at 512-byte blocks
            inode_count: 64,
            max_open_files: 32,
        }
    }
}

impl GeometryConfig {
    pub fn validate(&self) -> BfsResult<()> {
        if !self.block_size.is_power_of_two()
            || self.block_size < MIN_BLOCK_SIZE
            || self.block_size > MAX_BLOCK_SIZE
        {
            return Err(BfsError::Config(format!(
                "Block size must be a power of two between {MIN_BLOCK_SIZE} and {MAX_BLOCK_SIZE}, got {}",
                self.block_size
            )));
        }

        if self.inode_count == 0 {
            return Err(BfsError::Config(
                "Inode count must be greater than 0".to_string(),
            ));
        }

        if self.max_open_files == 0 {
            return Err(BfsError::Config(
                "Open-file table must hold at least one entry".to_string(),
            ));
        }

        let metadata_blocks = crate::storage::layout::Layout::compute(self).data_start;
        if self.total_blocks <= metadata_blocks {
            return Err(BfsError::Config(format!(
                "Total blocks ({}) leaves no room for data after {metadata_blocks} metadata blocks",
                self.total_blocks
            )));
        }

        Ok(())
    }
}

/// Top-level configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BfsConfig {
    /// Disk image path
    pub disk_path: String,
    /// Disk geometry
    pub geometry: GeometryConfig,
    /// Logging configuration
    pub logging: LogConfig,
}

impl BfsConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> BfsResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BfsError::Config(format!("Failed to read config file: {e}")))?;

        serde_json::from_str(&contents)
            .map_err(|e| BfsError::Config(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> BfsResult<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| BfsError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, contents)
            .map_err(|e| BfsError::Config(format!("Failed to write config file: {e}")))
    }

    /// Validate configuration
    pub fn validate(&self) -> BfsResult<()> {
        if self.disk_path.is_empty() {
            return Err(BfsError::Config("Disk path cannot be empty".to_string()));
        }

        self.geometry.validate()?;

        if self.logging.enabled && self.logging.file_path.is_empty() {
            return Err(BfsError::Config(
                "Log file path cannot be empty when logging is enabled".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for BfsConfig {
    fn default() -> Self {
        Self {
            disk_path: "BFSDISK".to_string(),
            geometry: GeometryConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration builder
#[derive(Default)]
pub struct BfsConfigBuilder {
    config: BfsConfig,
}

impl BfsConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disk_path(mut self, path: String) -> Self {
        self.config.disk_path = path;
        self
    }

    pub fn geometry(mut self, geometry: GeometryConfig) -> Self {
        self.config.geometry = geometry;
        self
    }

    pub fn block_size(mut self, block_size: u32) -> Self {
        self.config.geometry.block_size = block_size;
        self
    }

    pub fn total_blocks(mut self, total_blocks: u32) -> Self {
        self.config.geometry.total_blocks = total_blocks;
        self
    }

    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.config.logging = logging;
        self
    }

    pub fn build(self) -> BfsResult<BfsConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}
