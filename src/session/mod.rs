//! Proctored exam sessions: the per-student state machine and the
//! capabilities it is driven by (time and exclusive display).

pub mod clock;
pub mod display;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use display::{ClientDisplayMode, DisplayMode};
pub use state::{
    ExamSession, SessionState, SessionView, SubmissionOutcome, SweepDecision, ViolationVerdict,
    Visibility,
};
