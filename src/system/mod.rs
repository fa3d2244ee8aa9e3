pub mod aggregator;
pub mod collector;
pub mod history;
pub mod host;
pub mod platform;
pub mod process;
pub mod snapshot;
pub mod source;
