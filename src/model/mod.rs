pub mod achievement;
pub mod alarm;
pub mod config;
pub mod notebook;
pub mod task;

pub use achievement::*;
pub use alarm::*;
pub use config::*;
pub use notebook::*;
pub use task::*;
