use serde::{Deserialize, Serialize};

/// Experimental conditions of the gait/dual-task protocol.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    SingleTaskWalking,
    SingleTaskAudioSitting,
    DualTaskAudioWalking,
    SingleTaskVisualSitting,
    DualTaskVisualWalking,
    BaselineSitting,
    BaselineWalking,
    TrainingAudio,
    TrainingVisual,
}

/// Stimulus modality fixed by the condition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Modality {
    Audio,
    Visual,
    None,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Posture {
    Sitting,
    Walking,
}

/// Output label for lifecycle markers (`training:abort`, `experiment:end`, ...).
/// Set by the external caller, not derived from block state at runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Training,
    Experiment,
    Baseline,
}

impl Condition {
    /// Marker label, matching the recorded data format of previous studies.
    pub fn label(self) -> &'static str {
        match self {
            Condition::SingleTaskWalking => "ST_walking",
            Condition::SingleTaskAudioSitting => "ST_audio",
            Condition::DualTaskAudioWalking => "DT_audio",
            Condition::SingleTaskVisualSitting => "ST_visual",
            Condition::DualTaskVisualWalking => "DT_visual",
            Condition::BaselineSitting => "Baseline_sitting",
            Condition::BaselineWalking => "Baseline_walking",
            Condition::TrainingAudio => "Training_audio",
            Condition::TrainingVisual => "Training_visual",
        }
    }

    pub fn modality(self) -> Modality {
        match self {
            Condition::SingleTaskAudioSitting
            | Condition::DualTaskAudioWalking
            | Condition::TrainingAudio => Modality::Audio,
            Condition::SingleTaskVisualSitting
            | Condition::DualTaskVisualWalking
            | Condition::TrainingVisual => Modality::Visual,
            Condition::SingleTaskWalking
            | Condition::BaselineSitting
            | Condition::BaselineWalking => Modality::None,
        }
    }

    pub fn posture(self) -> Posture {
        match self {
            Condition::SingleTaskWalking
            | Condition::DualTaskAudioWalking
            | Condition::DualTaskVisualWalking
            | Condition::BaselineWalking => Posture::Walking,
            Condition::SingleTaskAudioSitting
            | Condition::SingleTaskVisualSitting
            | Condition::BaselineSitting
            | Condition::TrainingAudio
            | Condition::TrainingVisual => Posture::Sitting,
        }
    }

    /// Trial starts are gated on gait-zone entry for these conditions.
    pub fn is_gait_gated(self) -> bool {
        matches!(
            self,
            Condition::SingleTaskWalking
                | Condition::DualTaskAudioWalking
                | Condition::DualTaskVisualWalking
        )
    }

    /// Whether the condition runs stimulus-response trials at all.
    /// Baselines and single-task walking only accumulate time or gait passes.
    pub fn has_trials(self) -> bool {
        self.modality() != Modality::None
    }

    pub fn is_baseline(self) -> bool {
        matches!(self, Condition::BaselineSitting | Condition::BaselineWalking)
    }

    pub fn is_training(self) -> bool {
        matches!(self, Condition::TrainingAudio | Condition::TrainingVisual)
    }

    /// Stable index for per-condition bookkeeping (run counters).
    pub fn index(self) -> usize {
        match self {
            Condition::SingleTaskWalking => 0,
            Condition::SingleTaskAudioSitting => 1,
            Condition::DualTaskAudioWalking => 2,
            Condition::SingleTaskVisualSitting => 3,
            Condition::DualTaskVisualWalking => 4,
            Condition::BaselineSitting => 5,
            Condition::BaselineWalking => 6,
            Condition::TrainingAudio => 7,
            Condition::TrainingVisual => 8,
        }
    }

    pub const COUNT: usize = 9;
}

impl BlockKind {
    pub fn label(self) -> &'static str {
        match self {
            BlockKind::Training => "training",
            BlockKind::Experiment => "experiment",
            BlockKind::Baseline => "baseline",
        }
    }

    /// The label a condition would normally run under. Callers may override,
    /// e.g. when re-running an experiment condition as extra practice.
    pub fn for_condition(condition: Condition) -> Self {
        if condition.is_training() {
            BlockKind::Training
        } else if condition.is_baseline() {
            BlockKind::Baseline
        } else {
            BlockKind::Experiment
        }
    }
}
