use anyhow::Result;
use gaitex_core::{ActuatorSink, EventSink, Side};
use gaitex_experiment::{BlockEvent, ExperimentError, SequenceRunner};
use gaitex_io::{MeasurementRequest, OptoApiClient, xml_to_marker};
use gaitex_timing::FrameTicker;
use rand::rngs::ThreadRng;
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Operator/sensor input delivered between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Response(Side),
    GaitEnter,
    GaitExit,
    Abort,
    Quit,
}

pub type Runner = SequenceRunner<Box<dyn EventSink>, Box<dyn ActuatorSink>, ThreadRng>;

/// Host harness: owns the frame loop and glues the state machine to the
/// stdin input protocol and the vendor measurement service.
pub struct App {
    runner: Runner,
    opto: Option<OptoApiClient>,
    patient_id: String,
    tick_interval: Duration,
    inputs: Receiver<InputEvent>,
}

impl App {
    pub fn new(runner: Runner, opto: Option<OptoApiClient>, tick_hz: f64, patient_id: String) -> Self {
        Self {
            runner,
            opto,
            patient_id,
            tick_interval: Duration::from_secs_f64(1.0 / tick_hz.max(1.0)),
            inputs: spawn_stdin_reader(),
        }
    }

    pub fn run(mut self, sequence_id: usize) -> Result<()> {
        info!(sequence_id, "starting session");
        let events = self.runner.start_sequence(sequence_id)?;
        self.handle_events(&events);

        let mut ticker = FrameTicker::new();
        loop {
            let frame_start = Instant::now();

            if !self.drain_inputs()? {
                break;
            }

            let delta = ticker.tick();
            let result = self.runner.tick(delta);
            if !self.handle_result(result) {
                break;
            }

            if self.runner.is_finished() {
                info!("session finished");
                break;
            }

            let spent = frame_start.elapsed();
            if let Some(remaining) = self.tick_interval.checked_sub(spent) {
                thread::sleep(remaining);
            }
        }

        let stats = ticker.stats();
        info!(
            "tick loop: {:.3} ms/frame avg, jitter {:.3} ms, {:.1} Hz effective",
            stats.average_frame_time_ns / 1e6,
            stats.jitter_ns / 1e6,
            stats.effective_hz,
        );
        Ok(())
    }

    /// Feeds pending inputs into the state machine. Returns `false` when the
    /// session should stop.
    fn drain_inputs(&mut self) -> Result<bool> {
        loop {
            match self.inputs.try_recv() {
                Ok(InputEvent::Response(side)) => self.runner.submit_response(side),
                Ok(InputEvent::GaitEnter) => {
                    let result = self.runner.gait_entered();
                    if !self.handle_result(result) {
                        return Ok(false);
                    }
                }
                Ok(InputEvent::GaitExit) => {
                    let result = self.runner.gait_exited();
                    if !self.handle_result(result) {
                        return Ok(false);
                    }
                }
                Ok(InputEvent::Abort) => {
                    let events = self.runner.abort();
                    self.handle_events(&events);
                    return Ok(false);
                }
                Ok(InputEvent::Quit) => return Ok(false),
                Err(TryRecvError::Empty) => return Ok(true),
                Err(TryRecvError::Disconnected) => return Ok(false),
            }
        }
    }

    /// Applies a state machine result; fatal errors abort the block and stop
    /// the session. Returns `false` when the session should stop.
    fn handle_result(&mut self, result: Result<Vec<BlockEvent>, ExperimentError>) -> bool {
        match result {
            Ok(events) => {
                self.handle_events(&events);
                true
            }
            Err(err) => {
                error!(%err, "fatal state machine error, aborting block");
                let events = self.runner.abort();
                self.handle_events(&events);
                false
            }
        }
    }

    fn handle_events(&mut self, events: &[BlockEvent]) {
        for event in events {
            match event {
                BlockEvent::PassStarted { pass_no } => self.begin_measurement(*pass_no),
                BlockEvent::PassEnded { .. } => self.finish_measurement(),
                BlockEvent::BlockEnded { condition } => {
                    info!(condition = condition.label(), "block finished");
                }
                BlockEvent::SequenceEnded => info!("condition sequence complete"),
                _ => {}
            }
        }
    }

    fn begin_measurement(&mut self, pass_no: u32) {
        let Some(opto) = self.opto.as_mut() else {
            return;
        };
        let request = MeasurementRequest {
            patient_id: self.patient_id.clone(),
            test_name: format!("gait_pass_{pass_no}"),
        };
        if let Err(err) = opto.init_measurement(&request) {
            warn!(%err, pass_no, "measurement init failed, pass runs unmeasured");
        }
    }

    fn finish_measurement(&mut self) {
        let Some(opto) = self.opto.as_mut() else {
            return;
        };
        match opto.end_test() {
            Ok(result) => {
                let marker = xml_to_marker(&result);
                self.runner.controller_mut().events_mut().write(&marker);
            }
            Err(err) => warn!(%err, "measurement end failed"),
        }
    }
}

/// Reads the line-based input protocol from stdin on its own thread.
/// left/right score a response, enter/exit are the gait sensor edges.
fn spawn_stdin_reader() -> Receiver<InputEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let event = match line.trim() {
                "left" | "l" => InputEvent::Response(Side::Left),
                "right" | "r" => InputEvent::Response(Side::Right),
                "enter" | "in" => InputEvent::GaitEnter,
                "exit" | "out" => InputEvent::GaitExit,
                "abort" | "esc" => InputEvent::Abort,
                "quit" | "q" => InputEvent::Quit,
                "" => continue,
                other => {
                    warn!(input = other, "unrecognized input line");
                    continue;
                }
            };
            let quit = event == InputEvent::Quit;
            if tx.send(event).is_err() || quit {
                break;
            }
        }
    });
    rx
}
