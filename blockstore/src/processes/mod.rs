pub mod flush_condition;
pub mod pruning;
pub mod recovery;
