pub mod condition;
pub mod lifecycle;
pub mod sink;
pub mod stimulus;
pub mod trial;

pub use condition::{BlockKind, Condition, Modality, Posture};
pub use lifecycle::{BlockLifecycle, RunningState};
pub use sink::{ActuatorSink, EventSink, MemorySink, NullSink};
pub use stimulus::{
    AUDIO_STIMULI, Side, StimulusAttribute, StimulusSpec, VISUAL_STIMULI, stimulus_table,
};
pub use trial::{TrialOutcome, TrialRecord};
