use gaitex_core::{BlockLifecycle, Condition, MemorySink, RunningState, TrialOutcome};
use gaitex_experiment::{BlockConfig, BlockController, BlockEvent, SessionConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;

type TestController = BlockController<MemorySink, MemorySink, StdRng>;

fn controller(seed: u64) -> TestController {
    BlockController::new(MemorySink::new(), MemorySink::new(), 100, StdRng::seed_from_u64(seed))
}

fn walking_config(condition: Condition, passes: u32, trials_per_pass: u32) -> BlockConfig {
    let session = SessionConfig {
        gait_passes_per_block: passes,
        trials_per_gait_pass: trials_per_pass,
        ..SessionConfig::default()
    };
    BlockConfig::for_condition(condition, &session, 1)
}

/// Runs one armed trial to its timeout in a single oversized tick.
/// 10 s is past any ISI + stimulus + response window this config can build.
fn complete_trial(c: &mut TestController) -> Vec<BlockEvent> {
    c.tick(10.0).unwrap()
}

#[test]
fn dual_task_block_walks_through_its_budget() {
    let mut c = controller(1);
    c.start_block(walking_config(Condition::DualTaskAudioWalking, 2, 3))
        .unwrap();
    assert_eq!(
        c.lifecycle(),
        BlockLifecycle::Running(RunningState::WaitingForGait)
    );
    // No trial is armed until the participant enters the gait zone.
    assert_eq!(c.tick(0.5).unwrap(), vec![]);
    assert!(c.current_trial().is_none());

    // Pass 1: entry arms the first trial.
    let events = c.gait_entered().unwrap();
    assert!(events.iter().any(|e| matches!(e, BlockEvent::PassStarted { pass_no: 1 })));
    assert!(events.iter().any(|e| matches!(e, BlockEvent::TrialStarted { .. })));

    complete_trial(&mut c);
    complete_trial(&mut c);
    let events = complete_trial(&mut c);
    // Third completion spends the per-pass budget: frozen, no next trial.
    assert!(!events.iter().any(|e| matches!(e, BlockEvent::TrialStarted { .. })));
    assert!(c.gait().max_trials_in_pass_reached());
    assert_eq!(
        c.lifecycle(),
        BlockLifecycle::Running(RunningState::WaitingForGait)
    );

    // Still inside, still frozen: ticks must not start anything.
    for _ in 0..10 {
        assert_eq!(c.tick(0.1).unwrap(), vec![]);
    }

    // Pass 2 after walking out and back in.
    let events = c.gait_exited().unwrap();
    assert!(events.iter().any(|e| matches!(e, BlockEvent::PassEnded { pass_no: 1 })));
    assert_eq!(c.lifecycle(), BlockLifecycle::Running(RunningState::WaitingForGait));

    let events = c.gait_entered().unwrap();
    assert!(events.iter().any(|e| matches!(e, BlockEvent::PassStarted { pass_no: 2 })));
    assert!(events.iter().any(|e| matches!(e, BlockEvent::TrialStarted { .. })));

    complete_trial(&mut c);
    complete_trial(&mut c);
    let events = complete_trial(&mut c);
    assert!(events.iter().any(|e| matches!(e, BlockEvent::BlockEnded { .. })));
    assert_eq!(c.lifecycle(), BlockLifecycle::Ended);
    assert_eq!(c.trials_completed(), 6);
    assert!(c.events().contains("experiment:end"));
}

#[test]
fn gait_exit_mid_trial_aborts_without_spending_the_pass_budget() {
    let mut c = controller(2);
    c.start_block(walking_config(Condition::DualTaskVisualWalking, 2, 3))
        .unwrap();

    c.gait_entered().unwrap();
    complete_trial(&mut c);
    assert_eq!(c.gait().trials_in_pass(), 1);

    // Second trial is armed; walk out mid-ISI.
    c.tick(0.2).unwrap();
    assert!(c.current_trial().is_some());
    let events = c.gait_exited().unwrap();

    let aborted = events
        .iter()
        .find_map(|e| match e {
            BlockEvent::TrialEnded { record } => Some(record.clone()),
            _ => None,
        })
        .expect("abort produces a trial-end record");
    assert_eq!(aborted.outcome, TrialOutcome::Aborted);
    assert!(c.events().contains("trialAbort:2"));

    // Asymmetry with normal completion: the abort consumed no budget.
    assert_eq!(c.gait().trials_in_pass(), 1);
    assert_eq!(c.trials_completed(), 1);
    assert!(c.current_trial().is_none());

    // The re-presented stimulus is the one the aborted trial was showing.
    let aborted_stimulus = aborted.stimulus;
    let events = c.gait_entered().unwrap();
    assert!(events.iter().any(|e| matches!(e, BlockEvent::PassStarted { pass_no: 2 })));
    assert_eq!(c.current_trial().unwrap().stimulus, aborted_stimulus);
}

#[test]
fn cut_short_final_pass_still_ends_the_block() {
    let mut c = controller(3);
    c.start_block(walking_config(Condition::DualTaskAudioWalking, 2, 2))
        .unwrap();

    // Pass 1 completes its budget.
    c.gait_entered().unwrap();
    complete_trial(&mut c);
    complete_trial(&mut c);
    c.gait_exited().unwrap();

    // Pass 2 is abandoned after one trial: the pass budget is spent on the
    // exit edge, so the block ends with the missing trial unrecovered.
    c.gait_entered().unwrap();
    complete_trial(&mut c);
    let events = c.gait_exited().unwrap();
    assert!(events.iter().any(|e| matches!(e, BlockEvent::BlockEnded { .. })));
    assert_eq!(c.lifecycle(), BlockLifecycle::Ended);
    assert_eq!(c.trials_completed(), 3);
}

#[test]
fn overlapping_contacts_count_one_pass() {
    let mut c = controller(4);
    c.start_block(walking_config(Condition::DualTaskAudioWalking, 2, 1))
        .unwrap();

    // Both feet enter; one leaves; the pass is still in progress.
    let events = c.gait_entered().unwrap();
    assert!(events.iter().any(|e| matches!(e, BlockEvent::PassStarted { pass_no: 1 })));
    assert_eq!(c.gait_entered().unwrap(), vec![]);
    assert_eq!(c.gait_exited().unwrap(), vec![]);
    assert!(c.gait().is_inside());
    assert_eq!(c.gait().pass_count(), 1);

    let events = c.gait_exited().unwrap();
    assert!(events.iter().any(|e| matches!(e, BlockEvent::PassEnded { pass_no: 1 })));
    assert!(!c.gait().is_inside());
}

#[test]
fn single_task_walking_counts_passes_without_trials() {
    let mut c = controller(5);
    c.start_block(walking_config(Condition::SingleTaskWalking, 2, 3))
        .unwrap();

    let start = c
        .events()
        .lines
        .iter()
        .find(|l| l.starts_with("experiment:start"))
        .expect("start marker");
    assert!(start.contains("condition:ST_walking"));
    assert!(start.contains("gaitPasses:2"));
    assert!(!start.contains("trialsPerGaitPass"));

    let events = c.gait_entered().unwrap();
    assert!(events.iter().any(|e| matches!(e, BlockEvent::PassStarted { pass_no: 1 })));
    assert!(!events.iter().any(|e| matches!(e, BlockEvent::TrialStarted { .. })));
    assert!(c.current_trial().is_none());

    c.gait_exited().unwrap();
    assert_eq!(c.lifecycle(), BlockLifecycle::Running(RunningState::WaitingForGait));

    c.gait_entered().unwrap();
    let events = c.gait_exited().unwrap();
    assert!(events.iter().any(|e| matches!(e, BlockEvent::BlockEnded { .. })));
    assert!(c.events().contains("experiment:end"));
    assert_eq!(c.events().count_containing("gaitPass:"), 2);
}

#[test]
fn baseline_block_ends_on_its_duration() {
    let mut c = controller(6);
    let session = SessionConfig {
        baseline_duration: 1.0,
        ..SessionConfig::default()
    };
    c.start_block(BlockConfig::for_condition(Condition::BaselineSitting, &session, 1))
        .unwrap();
    assert_eq!(c.lifecycle(), BlockLifecycle::Running(RunningState::Baseline));
    assert!(c.events().contains("baseline:start"));

    assert_eq!(c.tick(0.5).unwrap(), vec![]);
    let events = c.tick(0.6).unwrap();
    assert!(events.iter().any(|e| matches!(e, BlockEvent::BlockEnded { .. })));
    assert!(c.events().contains("baseline:end"));
}
