use crate::config::BlockConfig;
use crate::dispatch::StimulusDispatcher;
use crate::error::ExperimentError;
use crate::gait::{GaitEdge, GaitTracker};
use crate::response::ResponseCollector;
use crate::sequence::{build_isi_sequence, build_stimulus_sequence};
use gaitex_core::{
    ActuatorSink, BlockKind, BlockLifecycle, Condition, EventSink, RunningState, Side,
    StimulusSpec, TrialOutcome, TrialRecord, stimulus_table,
};
use gaitex_timing::TrialClock;
use rand::Rng;
use tracing::{debug, info, warn};

/// Lifecycle activity reported back to the caller after each entry point.
///
/// The host uses these to bracket vendor measurements around gait passes and
/// the sequence runner uses `BlockEnded` to chain blocks.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockEvent {
    BlockStarted { condition: Condition, run_no: u32 },
    TrialStarted { trial_no: u32 },
    TrialEnded { record: TrialRecord },
    PassStarted { pass_no: u32 },
    PassEnded { pass_no: u32 },
    BlockEnded { condition: Condition },
    Aborted { kind: BlockKind },
    SequenceEnded,
}

/// Mutable state of the trial currently armed; recreated at every start.
#[derive(Debug)]
pub struct ActiveTrial {
    pub trial_no: u32,
    pub isi_duration: f32,
    pub stimulus: Option<StimulusSpec>,
    pub clock: TrialClock,
    pub responses: ResponseCollector,
}

/// The central orchestrator: owns block configuration and sequences, drives
/// trial transitions off scheduler ticks, and gates trial starts on gait
/// passes in walking conditions.
///
/// Single-threaded and cooperative. Sensor and response callbacks arrive
/// between ticks and only mutate state; the following `tick` acts on them.
pub struct BlockController<E, A, R>
where
    E: EventSink,
    A: ActuatorSink,
    R: Rng,
{
    events: E,
    dispatcher: StimulusDispatcher<A>,
    rng: R,
    lifecycle: BlockLifecycle,
    config: Option<BlockConfig>,
    stimuli: Vec<usize>,
    isi_durations: Vec<f32>,
    /// Sequence cursor; advances on completed trials only, so aborted trials
    /// re-present their stimulus and the generated length is never exceeded.
    cursor: usize,
    trials_started: u32,
    trials_completed: u32,
    gait: GaitTracker,
    block_elapsed: f32,
    current: Option<ActiveTrial>,
}

impl<E, A, R> BlockController<E, A, R>
where
    E: EventSink,
    A: ActuatorSink,
    R: Rng,
{
    pub fn new(events: E, actuator: A, stimulus_intensity: u8, rng: R) -> Self {
        Self {
            events,
            dispatcher: StimulusDispatcher::new(actuator, stimulus_intensity),
            rng,
            lifecycle: BlockLifecycle::Idle,
            config: None,
            stimuli: Vec::new(),
            isi_durations: Vec::new(),
            cursor: 0,
            trials_started: 0,
            trials_completed: 0,
            gait: GaitTracker::new(),
            block_elapsed: 0.0,
            current: None,
        }
    }

    pub fn lifecycle(&self) -> BlockLifecycle {
        self.lifecycle
    }

    pub fn config(&self) -> Option<&BlockConfig> {
        self.config.as_ref()
    }

    pub fn current_trial(&self) -> Option<&ActiveTrial> {
        self.current.as_ref()
    }

    pub fn trials_completed(&self) -> u32 {
        self.trials_completed
    }

    pub fn gait(&self) -> &GaitTracker {
        &self.gait
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    /// Initializes a block: builds both sequence arrays in full, emits the
    /// block-start markers, and arms the first trial (sitting) or the gait
    /// gate (walking).
    pub fn start_block(&mut self, config: BlockConfig) -> Result<Vec<BlockEvent>, ExperimentError> {
        if self.lifecycle.is_active() {
            return Err(ExperimentError::Config("a block is already running".into()));
        }
        config.validate()?;
        self.lifecycle = BlockLifecycle::Initializing;

        self.cursor = 0;
        self.trials_started = 0;
        self.trials_completed = 0;
        self.block_elapsed = 0.0;
        self.current = None;
        self.gait.reset();

        let total = config.total_trials();
        if total > 0 {
            self.stimuli = build_stimulus_sequence(total, 4, &mut self.rng)?;
            self.isi_durations = build_isi_sequence(
                total,
                config.timing.isi_duration_avg,
                config.timing.isi_duration_variation,
                &mut self.rng,
            )?;
        } else {
            self.stimuli.clear();
            self.isi_durations.clear();
        }

        self.write_start_markers(&config);
        info!(
            condition = config.condition.label(),
            run_no = config.run_no,
            "block started"
        );

        let mut out = vec![BlockEvent::BlockStarted {
            condition: config.condition,
            run_no: config.run_no,
        }];

        let condition = config.condition;
        self.config = Some(config);

        if condition.is_gait_gated() {
            self.lifecycle = BlockLifecycle::Running(RunningState::WaitingForGait);
        } else if condition.is_baseline() {
            self.lifecycle = BlockLifecycle::Running(RunningState::Baseline);
        } else {
            self.lifecycle = BlockLifecycle::Running(RunningState::Sitting);
            self.start_trial(&mut out)?;
        }

        Ok(out)
    }

    /// Advances the block by one scheduler tick. A tick with no block active
    /// is a no-op, not an error.
    pub fn tick(&mut self, delta: f32) -> Result<Vec<BlockEvent>, ExperimentError> {
        let mut out = Vec::new();
        let state = match self.lifecycle {
            BlockLifecycle::Running(state) => state,
            BlockLifecycle::Idle
            | BlockLifecycle::Initializing
            | BlockLifecycle::Aborting
            | BlockLifecycle::Ended => return Ok(out),
        };

        self.block_elapsed += delta;

        match state {
            RunningState::Baseline => {
                let duration = self.config.as_ref().map_or(0.0, |c| c.baseline_duration);
                if self.block_elapsed >= duration {
                    self.end_block(&mut out);
                }
            }
            RunningState::WaitingForGait => {}
            RunningState::Sitting | RunningState::Trial => {
                self.advance_trial(delta, &mut out)?;
            }
        }

        Ok(out)
    }

    /// Records a participant response with the current trial-clock timestamp.
    pub fn submit_response(&mut self, side: Side) {
        match self.current.as_ref().map(|t| t.clock.elapsed()) {
            Some(at_time) => self.submit_response_at(side, at_time),
            None => {
                self.events.write(&format!(
                    "controller response (outside response time): {}",
                    side.label()
                ));
            }
        }
    }

    /// Records a participant response at an explicit trial-clock timestamp.
    /// The captured response advances the trial on the next tick.
    pub fn submit_response_at(&mut self, side: Side, at_time: f32) {
        let Some(trial) = self.current.as_mut() else {
            self.events.write(&format!(
                "controller response (outside response time): {}",
                side.label()
            ));
            return;
        };
        trial.responses.record(side, at_time, &mut self.events);
    }

    /// Raw gait-sensor contact entered the zone.
    pub fn gait_entered(&mut self) -> Result<Vec<BlockEvent>, ExperimentError> {
        let mut out = Vec::new();
        let state = match self.lifecycle {
            BlockLifecycle::Running(state) => state,
            _ => return Ok(out),
        };
        let Some(condition) = self.config.as_ref().map(|c| c.condition) else {
            return Ok(out);
        };
        if !condition.is_gait_gated() {
            return Ok(out);
        }

        if let Some(GaitEdge::PassStarted(pass_no)) = self.gait.on_enter() {
            self.events.write(&format!("gaitPass:{pass_no}"));
            debug!(pass_no, "gait pass started");
            out.push(BlockEvent::PassStarted { pass_no });

            if state == RunningState::WaitingForGait
                && condition.has_trials()
                && !self.gait.max_trials_in_pass_reached()
            {
                self.start_trial(&mut out)?;
                self.lifecycle = BlockLifecycle::Running(RunningState::Trial);
            }
        }

        Ok(out)
    }

    /// Raw gait-sensor contact left the zone. Leaving mid-trial aborts the
    /// trial without consuming the per-pass budget.
    pub fn gait_exited(&mut self) -> Result<Vec<BlockEvent>, ExperimentError> {
        let mut out = Vec::new();
        let state = match self.lifecycle {
            BlockLifecycle::Running(state) => state,
            _ => return Ok(out),
        };
        let Some(config) = self.config.as_ref() else {
            return Ok(out);
        };
        let condition = config.condition;
        let pass_budget = config.gait_passes_per_block;
        if !condition.is_gait_gated() {
            return Ok(out);
        }

        if let Some(GaitEdge::ZoneExited) = self.gait.on_exit() {
            let pass_no = self.gait.pass_count();
            debug!(pass_no, "gait zone exited");
            out.push(BlockEvent::PassEnded { pass_no });

            if state == RunningState::Trial && self.current.is_some() {
                let trial_no = self.trials_started;
                self.events.write(&format!("trialAbort:{trial_no}"));
                warn!(trial_no, "trial aborted by gait exit");
                self.next_trial(TrialOutcome::Aborted, &mut out)?;
            }

            // The pass budget is spent once the final budgeted pass has been
            // walked end to end. Trials lost to a cut-short pass are not made
            // up; the sequence arrays are sized so completed trials can never
            // outrun them.
            if self.gait.pass_count() >= pass_budget && self.lifecycle.is_active() {
                self.end_block(&mut out);
            }
        }

        Ok(out)
    }

    /// External cancel: any state back to Idle, emitting the abort marker
    /// under the block-kind label.
    pub fn abort(&mut self) -> Vec<BlockEvent> {
        let mut out = Vec::new();
        let Some(kind) = self.config.as_ref().map(|c| c.kind) else {
            return out;
        };

        self.lifecycle = BlockLifecycle::Aborting;
        self.events.write(&format!("{}:abort", kind.label()));
        info!(kind = kind.label(), "block aborted");

        self.current = None;
        self.config = None;
        self.stimuli.clear();
        self.isi_durations.clear();
        self.gait.reset();
        self.lifecycle = BlockLifecycle::Idle;

        out.push(BlockEvent::Aborted { kind });
        out
    }

    fn advance_trial(
        &mut self,
        delta: f32,
        out: &mut Vec<BlockEvent>,
    ) -> Result<(), ExperimentError> {
        let (modality, stimulus_duration) = match self.config.as_ref() {
            Some(c) => (c.condition.modality(), c.timing.stimulus_duration),
            None => return Ok(()),
        };
        let Some(trial) = self.current.as_mut() else {
            return Ok(());
        };

        let edges = trial.clock.advance(delta);

        if edges.isi_started {
            self.events.write("ISI started");
        }
        if edges.stimulus_onset {
            self.events.write("ISI ended");
            if let Some(spec) = trial.stimulus {
                self.dispatcher
                    .trigger(&mut self.events, modality, spec, stimulus_duration);
            }
            trial.responses.open_window(trial.clock.elapsed());
        }

        let responded = trial.responses.has_response();
        if responded {
            self.next_trial(TrialOutcome::Responded, out)?;
        } else if edges.response_timed_out {
            self.events.write("response time over");
            self.next_trial(TrialOutcome::TimedOut, out)?;
        }

        Ok(())
    }

    /// Transition out of the current trial: emit the trial-end marker, count
    /// the trial against its budget (unless aborted), and either arm the next
    /// trial, freeze until the next gait pass, or end the block.
    fn next_trial(
        &mut self,
        outcome: TrialOutcome,
        out: &mut Vec<BlockEvent>,
    ) -> Result<(), ExperimentError> {
        let Some(trial) = self.current.take() else {
            return Ok(());
        };
        let (condition, trials_per_block, trials_per_pass, pass_budget) =
            match self.config.as_ref() {
                Some(c) => (
                    c.condition,
                    c.trials_per_block,
                    c.trials_per_gait_pass,
                    c.gait_passes_per_block,
                ),
                None => return Ok(()),
            };

        self.events.write(&format!("trialEnd:{}", trial.trial_no));

        let (response, response_latency) = match trial.responses.response() {
            Some((side, latency)) => (Some(side), Some(latency)),
            None => (None, None),
        };
        out.push(BlockEvent::TrialEnded {
            record: TrialRecord {
                trial_no: trial.trial_no,
                stimulus: trial.stimulus,
                isi_duration: trial.isi_duration,
                response,
                response_latency,
                outcome,
            },
        });

        let counted = outcome != TrialOutcome::Aborted;
        if counted {
            self.cursor += 1;
            self.trials_completed += 1;
        }

        if condition.is_gait_gated() {
            if counted {
                let frozen = self.gait.record_trial_in_pass(trials_per_pass);
                if frozen {
                    self.lifecycle = BlockLifecycle::Running(RunningState::WaitingForGait);
                    if self.gait.pass_count() >= pass_budget {
                        self.end_block(out);
                    }
                } else if self.gait.is_inside() {
                    self.start_trial(out)?;
                } else {
                    self.lifecycle = BlockLifecycle::Running(RunningState::WaitingForGait);
                }
            } else {
                self.lifecycle = BlockLifecycle::Running(RunningState::WaitingForGait);
            }
        } else if self.trials_completed >= trials_per_block {
            self.end_block(out);
        } else {
            self.start_trial(out)?;
        }

        Ok(())
    }

    fn start_trial(&mut self, out: &mut Vec<BlockEvent>) -> Result<(), ExperimentError> {
        let (condition, timing) = match self.config.as_ref() {
            Some(c) => (c.condition, c.timing),
            None => return Ok(()),
        };

        let index = self.cursor;
        if index >= self.stimuli.len() {
            return Err(ExperimentError::SequenceExhausted {
                index,
                len: self.stimuli.len(),
            });
        }

        self.trials_started += 1;
        let trial_no = self.trials_started;
        let isi_duration = self.isi_durations[index];
        let stimulus = stimulus_table(condition.modality()).map(|table| table[self.stimuli[index]]);

        let stimulus_label = stimulus.map_or_else(|| "none".to_string(), |s| s.to_string());
        self.events.write(&format!(
            "trialStart:{trial_no};condition:{};isiDuration:{isi_duration};stimulus:{stimulus_label}",
            condition.label()
        ));
        debug!(trial_no, isi_duration, %stimulus_label, "trial started");

        self.current = Some(ActiveTrial {
            trial_no,
            isi_duration,
            stimulus,
            clock: TrialClock::new(timing.trial_timing(isi_duration)),
            responses: ResponseCollector::new(),
        });
        out.push(BlockEvent::TrialStarted { trial_no });

        Ok(())
    }

    fn end_block(&mut self, out: &mut Vec<BlockEvent>) {
        let Some(config) = self.config.as_ref() else {
            return;
        };
        self.events.write(&format!("{}:end", config.kind.label()));
        info!(condition = config.condition.label(), "block ended");

        self.current = None;
        self.lifecycle = BlockLifecycle::Ended;
        out.push(BlockEvent::BlockEnded {
            condition: config.condition,
        });
    }

    fn write_start_markers(&mut self, config: &BlockConfig) {
        let timing = &config.timing;
        let mut marker = format!(
            "{}:start;condition:{};runNo:{}",
            config.kind.label(),
            config.condition.label(),
            config.run_no
        );

        if config.condition.is_baseline() {
            marker.push_str(&format!(";duration:{}", config.baseline_duration));
        } else if config.condition.is_gait_gated() {
            marker.push_str(&format!(";gaitPasses:{}", config.gait_passes_per_block));
            if config.condition.has_trials() {
                marker.push_str(&format!(
                    ";trialsPerGaitPass:{};isiDurationAvg:{};isiDurationVariation:{};responseTimeMax:{}",
                    config.trials_per_gait_pass,
                    timing.isi_duration_avg,
                    timing.isi_duration_variation,
                    timing.response_time_max
                ));
            }
        } else {
            marker.push_str(&format!(
                ";trialsTotal:{};isiDurationAvg:{};isiDurationVariation:{};responseTimeMax:{}",
                config.trials_per_block,
                timing.isi_duration_avg,
                timing.isi_duration_variation,
                timing.response_time_max
            ));
        }
        self.events.write(&marker);

        if let Some(participant) = &config.participant {
            self.events.write(&format!(
                "participantID:{};participantAge:{};participantGroup:{};participantGender:{}",
                participant.id, participant.age, participant.group, participant.gender
            ));
        }
    }
}
