pub mod error;
pub mod time_gate;
pub mod timer;

pub use error::ScheduleError;
pub use time_gate::{
    compute_activation, explain_activation, format_countdown, parse_schedule_time, time_until,
    Activation,
};
pub use timer::ActivationTimer;
