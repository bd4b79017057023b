use crate::error::ExperimentError;
use gaitex_core::{BlockKind, Condition};
use gaitex_timing::TrialTiming;
use serde::{Deserialize, Serialize};

/// Session-wide parameters, loadable from JSON. Defaults match the values
/// the protocol was piloted with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_isi_duration_avg")]
    pub isi_duration_avg: f32,
    #[serde(default = "SessionConfig::default_isi_duration_variation")]
    pub isi_duration_variation: f32,
    #[serde(default = "SessionConfig::default_stimulus_duration")]
    pub stimulus_duration: f32,
    #[serde(default = "SessionConfig::default_response_time_max")]
    pub response_time_max: f32,
    #[serde(default = "SessionConfig::default_stimulus_intensity")]
    pub stimulus_intensity: u8,

    #[serde(default = "SessionConfig::default_gait_passes_per_block")]
    pub gait_passes_per_block: u32,
    #[serde(default = "SessionConfig::default_trials_per_gait_pass")]
    pub trials_per_gait_pass: u32,
    #[serde(default = "SessionConfig::default_trials_sitting_per_block")]
    pub trials_sitting_per_block: u32,

    #[serde(default = "SessionConfig::default_trials_per_cond_training")]
    pub trials_per_cond_training: u32,

    /// Baseline recording length in seconds.
    #[serde(default = "SessionConfig::default_baseline_duration")]
    pub baseline_duration: f32,

    #[serde(default)]
    pub participant: Option<ParticipantInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: String,
    pub age: u32,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub gender: String,
}

impl SessionConfig {
    fn default_isi_duration_avg() -> f32 {
        1.0
    }
    fn default_isi_duration_variation() -> f32 {
        0.5
    }
    fn default_stimulus_duration() -> f32 {
        0.01
    }
    fn default_response_time_max() -> f32 {
        1.9
    }
    fn default_stimulus_intensity() -> u8 {
        100
    }
    fn default_gait_passes_per_block() -> u32 {
        35
    }
    fn default_trials_per_gait_pass() -> u32 {
        3
    }
    fn default_trials_sitting_per_block() -> u32 {
        100
    }
    fn default_trials_per_cond_training() -> u32 {
        5
    }
    fn default_baseline_duration() -> f32 {
        300.0
    }

    pub fn timing(&self) -> TimingConfig {
        TimingConfig {
            isi_duration_avg: self.isi_duration_avg,
            isi_duration_variation: self.isi_duration_variation,
            stimulus_duration: self.stimulus_duration,
            response_time_max: self.response_time_max,
            stimulus_intensity: self.stimulus_intensity,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            isi_duration_avg: Self::default_isi_duration_avg(),
            isi_duration_variation: Self::default_isi_duration_variation(),
            stimulus_duration: Self::default_stimulus_duration(),
            response_time_max: Self::default_response_time_max(),
            stimulus_intensity: Self::default_stimulus_intensity(),
            gait_passes_per_block: Self::default_gait_passes_per_block(),
            trials_per_gait_pass: Self::default_trials_per_gait_pass(),
            trials_sitting_per_block: Self::default_trials_sitting_per_block(),
            trials_per_cond_training: Self::default_trials_per_cond_training(),
            baseline_duration: Self::default_baseline_duration(),
            participant: None,
        }
    }
}

/// Timing parameters shared by every trial of a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingConfig {
    pub isi_duration_avg: f32,
    pub isi_duration_variation: f32,
    pub stimulus_duration: f32,
    pub response_time_max: f32,
    pub stimulus_intensity: u8,
}

impl TimingConfig {
    pub fn trial_timing(&self, isi_duration: f32) -> TrialTiming {
        TrialTiming {
            isi_duration,
            stimulus_duration: self.stimulus_duration,
            response_time_max: self.response_time_max,
        }
    }
}

/// Immutable per-run block parameters.
#[derive(Debug, Clone)]
pub struct BlockConfig {
    pub condition: Condition,
    pub kind: BlockKind,
    pub run_no: u32,
    /// Sitting/training trial budget.
    pub trials_per_block: u32,
    /// Walking budgets.
    pub gait_passes_per_block: u32,
    pub trials_per_gait_pass: u32,
    /// Baseline length in seconds.
    pub baseline_duration: f32,
    pub timing: TimingConfig,
    pub participant: Option<ParticipantInfo>,
}

impl BlockConfig {
    pub fn for_condition(condition: Condition, session: &SessionConfig, run_no: u32) -> Self {
        let trials_per_block = if condition.is_training() {
            session.trials_per_cond_training
        } else {
            session.trials_sitting_per_block
        };
        Self {
            condition,
            kind: BlockKind::for_condition(condition),
            run_no,
            trials_per_block,
            gait_passes_per_block: session.gait_passes_per_block,
            trials_per_gait_pass: session.trials_per_gait_pass,
            baseline_duration: session.baseline_duration,
            timing: session.timing(),
            participant: session.participant.clone(),
        }
    }

    /// Total trials the block can complete; the generated sequences are sized
    /// to exactly this.
    pub fn total_trials(&self) -> usize {
        if !self.condition.has_trials() {
            0
        } else if self.condition.is_gait_gated() {
            (self.gait_passes_per_block * self.trials_per_gait_pass) as usize
        } else {
            self.trials_per_block as usize
        }
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        if self.condition.has_trials() && self.total_trials() == 0 {
            return Err(ExperimentError::Config(format!(
                "condition {} has a zero trial budget",
                self.condition.label()
            )));
        }
        if self.condition.is_gait_gated() && self.gait_passes_per_block == 0 {
            return Err(ExperimentError::Config(format!(
                "condition {} has a zero gait-pass budget",
                self.condition.label()
            )));
        }
        if self.condition.is_baseline() && self.baseline_duration <= 0.0 {
            return Err(ExperimentError::Config(
                "baseline duration must be positive".into(),
            ));
        }
        if self.timing.isi_duration_variation < 0.0
            || self.timing.isi_duration_avg < self.timing.isi_duration_variation
        {
            return Err(ExperimentError::Config(format!(
                "ISI range [{} - {}] reaches below zero",
                self.timing.isi_duration_avg, self.timing.isi_duration_variation
            )));
        }
        Ok(())
    }
}
