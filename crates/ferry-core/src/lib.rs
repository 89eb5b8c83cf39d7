//! ferry-core — shared types, wire commands, frame codec, and configuration.
//! All other Ferry crates depend on this one.

pub mod command;
pub mod config;
pub mod frame;

pub use command::Command;
pub use config::FerryConfig;
