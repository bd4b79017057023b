use gaitex_core::{Condition, MemorySink};
use gaitex_experiment::{
    BlockController, BlockEvent, CONDITION_SEQUENCES, ExperimentError, RunCounters, SequenceRunner,
    SessionConfig,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

type TestRunner = SequenceRunner<MemorySink, MemorySink, StdRng>;

fn runner(seed: u64) -> TestRunner {
    let controller =
        BlockController::new(MemorySink::new(), MemorySink::new(), 100, StdRng::seed_from_u64(seed));
    // Minimal budgets so a whole session fits in a handful of steps.
    let session = SessionConfig {
        trials_sitting_per_block: 1,
        gait_passes_per_block: 1,
        trials_per_gait_pass: 1,
        ..SessionConfig::default()
    };
    SequenceRunner::new(controller, session)
}

#[test]
fn every_schedule_is_a_permutation_of_the_five_conditions() {
    for schedule in CONDITION_SEQUENCES {
        let mut labels: Vec<_> = schedule.iter().map(|c| c.label()).collect();
        labels.sort_unstable();
        assert_eq!(
            labels,
            vec!["DT_audio", "DT_visual", "ST_audio", "ST_visual", "ST_walking"]
        );
    }
}

#[test]
fn run_counters_are_per_condition_monotonic() {
    let mut counters = RunCounters::new();
    assert_eq!(counters.next(Condition::DualTaskAudioWalking), 1);
    assert_eq!(counters.next(Condition::DualTaskAudioWalking), 2);
    assert_eq!(counters.next(Condition::SingleTaskAudioSitting), 1);
    assert_eq!(counters.count(Condition::DualTaskAudioWalking), 2);
}

#[test]
fn invalid_sequence_id_is_rejected() {
    let mut r = runner(1);
    assert!(matches!(r.start_sequence(0), Err(ExperimentError::Config(_))));
    assert!(matches!(r.start_sequence(13), Err(ExperimentError::Config(_))));
    assert!(r.start_sequence(12).is_ok());
}

#[test]
fn sequence_one_chains_all_five_blocks() {
    let mut r = runner(2);
    r.start_sequence(1).unwrap();
    // Sequence 1: ST_walking, ST_audio, DT_audio, ST_visual, DT_visual.
    assert_eq!(r.current_condition(), Some(Condition::SingleTaskWalking));

    // ST_walking: one pass, no trials; ends on the exit edge and the runner
    // chains straight into the sitting block.
    r.gait_entered().unwrap();
    let events = r.gait_exited().unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        BlockEvent::BlockStarted { condition: Condition::SingleTaskAudioSitting, .. }
    )));
    assert_eq!(r.current_condition(), Some(Condition::SingleTaskAudioSitting));

    // ST_audio: single trial, timed out.
    let events = r.tick(10.0).unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        BlockEvent::BlockStarted { condition: Condition::DualTaskAudioWalking, .. }
    )));

    // DT_audio: one pass of one trial.
    r.gait_entered().unwrap();
    let events = r.tick(10.0).unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        BlockEvent::BlockStarted { condition: Condition::SingleTaskVisualSitting, .. }
    )));

    // ST_visual, then DT_visual.
    r.tick(10.0).unwrap();
    assert_eq!(r.current_condition(), Some(Condition::DualTaskVisualWalking));
    r.gait_entered().unwrap();
    let events = r.tick(10.0).unwrap();

    assert!(events.iter().any(|e| matches!(e, BlockEvent::SequenceEnded)));
    assert!(r.is_finished());
    assert!(r.controller().events().contains("sequence:end"));

    // Every experiment block in a fresh session runs as runNo 1.
    assert_eq!(r.controller().events().count_containing("runNo:1"), 5);
}

#[test]
fn abort_stops_the_whole_sequence() {
    let mut r = runner(3);
    r.start_sequence(5).unwrap();
    // Sequence 5 starts with DT_audio.
    assert_eq!(r.current_condition(), Some(Condition::DualTaskAudioWalking));

    let events = r.abort();
    assert!(events.iter().any(|e| matches!(e, BlockEvent::Aborted { .. })));
    assert!(r.is_finished());
    assert!(r.controller().events().contains("experiment:abort"));
    // Nothing restarts on further ticks.
    assert_eq!(r.tick(0.1).unwrap(), vec![]);
}
