extern crate self as granary_core;

pub mod log;
