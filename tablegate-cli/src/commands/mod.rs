//! Command implementations for the tablegate CLI

pub mod blobs;
pub mod health;
pub mod serve;
pub mod tables;

pub use blobs::run_blobs;
pub use health::run_health;
pub use serve::run_serve;
pub use tables::run_tables;
