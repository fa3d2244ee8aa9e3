//! Plain-text rendering of snapshots for the terminal presentation port.

pub mod gauges;
pub mod header;
pub mod statusbar;
pub mod table;

#[cfg(test)]
mod tests;
