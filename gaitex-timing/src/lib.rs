pub mod clock;
pub mod ticker;

pub use clock::{TickEdges, TrialClock, TrialPhase, TrialTiming, phase_at};
pub use ticker::{FrameTicker, TickStats};
