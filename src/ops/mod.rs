pub mod achievements;
pub mod stats;
pub mod task_ops;
