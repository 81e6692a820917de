//! anteroom-core — shared configuration and primitives.
//!
//! Home of the `anteroom.toml` parser, the live admission-rate handle
//! shared between the rate controller (writer) and the fan-out trigger
//! (reader), and admission token generation.

pub mod config;
pub mod rate;
pub mod token;

pub use config::AnteroomConfig;
pub use rate::RateHandle;
