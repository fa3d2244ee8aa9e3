pub mod config;
pub mod error;
pub mod format;
pub mod monitor;
pub mod sampler;
pub mod system;
pub mod theme;
pub mod ui;
