use crate::block::{BlockController, BlockEvent};
use crate::config::{BlockConfig, SessionConfig};
use crate::error::ExperimentError;
use gaitex_core::{ActuatorSink, Condition, EventSink, Side};
use rand::Rng;
use tracing::info;

use gaitex_core::Condition::{
    DualTaskAudioWalking as DtA, DualTaskVisualWalking as DtV, SingleTaskAudioSitting as StA,
    SingleTaskVisualSitting as StV, SingleTaskWalking as StW,
};

/// The 12 approved 5-condition orderings of the counterbalancing schedule.
pub const CONDITION_SEQUENCES: [[Condition; 5]; 12] = [
    [StW, StA, DtA, StV, DtV], // sequence 1
    [StW, StA, DtV, StV, DtA], // sequence 2
    [StW, StV, DtA, StA, DtV], // sequence 3
    [StW, StV, DtV, StA, DtA], // sequence 4
    [DtA, StA, StW, StV, DtV], // sequence 5
    [DtA, StA, DtV, StV, StW], // sequence 6
    [DtA, StV, StW, StA, DtV], // sequence 7
    [DtA, StV, DtV, StA, StW], // sequence 8
    [DtV, StA, DtA, StV, StW], // sequence 9
    [DtV, StA, StW, StV, DtA], // sequence 10
    [DtV, StV, DtA, StA, StW], // sequence 11
    [DtV, StV, StW, StA, DtA], // sequence 12
];

/// Per-condition monotonic run numbers, persisting across the session.
#[derive(Debug, Clone, Default)]
pub struct RunCounters {
    counts: [u32; Condition::COUNT],
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments and returns the run number for the condition's next block.
    pub fn next(&mut self, condition: Condition) -> u32 {
        let slot = &mut self.counts[condition.index()];
        *slot += 1;
        *slot
    }

    pub fn count(&self, condition: Condition) -> u32 {
        self.counts[condition.index()]
    }
}

/// Chains the blocks of one participant session: starts the first condition
/// of the chosen ordering and advances on every block end.
pub struct SequenceRunner<E, A, R>
where
    E: EventSink,
    A: ActuatorSink,
    R: Rng,
{
    controller: BlockController<E, A, R>,
    session: SessionConfig,
    counters: RunCounters,
    schedule: Option<[Condition; 5]>,
    cursor: usize,
    finished: bool,
}

impl<E, A, R> SequenceRunner<E, A, R>
where
    E: EventSink,
    A: ActuatorSink,
    R: Rng,
{
    pub fn new(controller: BlockController<E, A, R>, session: SessionConfig) -> Self {
        Self {
            controller,
            session,
            counters: RunCounters::new(),
            schedule: None,
            cursor: 0,
            finished: false,
        }
    }

    pub fn controller(&self) -> &BlockController<E, A, R> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut BlockController<E, A, R> {
        &mut self.controller
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_condition(&self) -> Option<Condition> {
        self.schedule.map(|s| s[self.cursor])
    }

    /// Starts the session with ordering `sequence_id` (1..=12).
    pub fn start_sequence(&mut self, sequence_id: usize) -> Result<Vec<BlockEvent>, ExperimentError> {
        if !(1..=CONDITION_SEQUENCES.len()).contains(&sequence_id) {
            return Err(ExperimentError::Config(format!(
                "sequence id {sequence_id} outside 1..=12"
            )));
        }
        let schedule = CONDITION_SEQUENCES[sequence_id - 1];
        info!(sequence_id, ?schedule, "starting condition sequence");

        self.schedule = Some(schedule);
        self.cursor = 0;
        self.finished = false;
        self.start_current_block()
    }

    /// One scheduler tick; chains into the next block when the current one
    /// ends.
    pub fn tick(&mut self, delta: f32) -> Result<Vec<BlockEvent>, ExperimentError> {
        let events = self.controller.tick(delta)?;
        self.chain(events)
    }

    pub fn gait_entered(&mut self) -> Result<Vec<BlockEvent>, ExperimentError> {
        let events = self.controller.gait_entered()?;
        self.chain(events)
    }

    pub fn gait_exited(&mut self) -> Result<Vec<BlockEvent>, ExperimentError> {
        let events = self.controller.gait_exited()?;
        self.chain(events)
    }

    pub fn submit_response(&mut self, side: Side) {
        self.controller.submit_response(side);
    }

    /// Aborts the running block and the rest of the sequence; control goes
    /// back to the caller's menu.
    pub fn abort(&mut self) -> Vec<BlockEvent> {
        let events = self.controller.abort();
        self.schedule = None;
        self.finished = true;
        events
    }

    fn start_current_block(&mut self) -> Result<Vec<BlockEvent>, ExperimentError> {
        let Some(schedule) = self.schedule else {
            return Ok(Vec::new());
        };
        let condition = schedule[self.cursor];
        let run_no = self.counters.next(condition);
        let config = BlockConfig::for_condition(condition, &self.session, run_no);
        self.controller.start_block(config)
    }

    /// Appends follow-up events when a block just ended: either the next
    /// block's start events or the sequence-end record.
    fn chain(&mut self, mut events: Vec<BlockEvent>) -> Result<Vec<BlockEvent>, ExperimentError> {
        let ended = events
            .iter()
            .any(|e| matches!(e, BlockEvent::BlockEnded { .. }));
        if !ended || self.finished {
            return Ok(events);
        }
        let Some(schedule) = self.schedule else {
            return Ok(events);
        };

        if self.cursor + 1 < schedule.len() {
            self.cursor += 1;
            events.extend(self.start_current_block()?);
        } else {
            self.controller.events_mut().write("sequence:end");
            info!("condition sequence finished");
            self.finished = true;
            self.schedule = None;
            events.push(BlockEvent::SequenceEnded);
        }
        Ok(events)
    }
}
