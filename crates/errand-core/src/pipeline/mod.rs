//! The three pipeline stages: message intake, the task processor loop, and
//! the task monitor loop.

pub mod intake;
pub mod monitor;
pub mod processor;

pub use intake::{InboundMessage, Intake, IntakeOutcome};
pub use monitor::TaskMonitor;
pub use processor::TaskProcessor;
