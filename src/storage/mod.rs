//! Storage layer: fixed-size page I/O over a single database file.

mod disk_manager;

pub use disk_manager::DiskManager;
