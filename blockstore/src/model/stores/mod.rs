pub mod blocks;
pub mod common;
pub mod transactions;

pub use granary_database::prelude::DB;
