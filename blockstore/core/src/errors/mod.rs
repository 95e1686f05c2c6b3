pub mod chain;
pub mod config;
