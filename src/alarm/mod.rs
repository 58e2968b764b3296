pub mod clock;
pub mod interval;
pub mod scheduler;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use interval::Interval;
pub use scheduler::{AlarmScheduler, FireOutcome, Fired};
pub use service::AlarmService;
