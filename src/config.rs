//! Process-wide configuration, mirroring the source's `dbms/common/config.py`
//! constants as one serde-serializable value threaded into [`crate::engine::Db::open`]
//! instead of read from globals.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default number of frames in the buffer pool, matching the source's
/// `BUFFER_POOL_SIZE = 10`.
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub db_path: PathBuf,
    pub buffer_pool_size: usize,
    pub sync_on_write: bool,
}

impl Config {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            buffer_pool_size: DEFAULT_BUFFER_POOL_SIZE,
            sync_on_write: false,
        }
    }

    pub fn with_buffer_pool_size(mut self, size: usize) -> Self {
        self.buffer_pool_size = size;
        self
    }

    pub fn with_sync_on_write(mut self, sync_on_write: bool) -> Self {
        self.sync_on_write = sync_on_write;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_source_constants() {
        let config = Config::new("db.bin");
        assert_eq!(config.buffer_pool_size, DEFAULT_BUFFER_POOL_SIZE);
        assert!(!config.sync_on_write);
    }

    #[test]
    fn builder_setters_override_defaults() {
        let config = Config::new("db.bin").with_buffer_pool_size(4).with_sync_on_write(true);
        assert_eq!(config.buffer_pool_size, 4);
        assert!(config.sync_on_write);
    }
}
