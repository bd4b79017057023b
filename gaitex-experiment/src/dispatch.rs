use gaitex_core::{ActuatorSink, EventSink, Modality, StimulusSpec};
use tracing::debug;

/// Maps a trial's stimulus to an actuator command and a marker record.
///
/// Dispatch is fire-and-forget: the actuator sink swallows delivery failures,
/// and trial timing proceeds whether or not the hardware confirmed anything.
#[derive(Debug)]
pub struct StimulusDispatcher<A: ActuatorSink> {
    actuator: A,
    intensity: u8,
}

impl<A: ActuatorSink> StimulusDispatcher<A> {
    pub fn new(actuator: A, intensity: u8) -> Self {
        Self {
            actuator,
            intensity: intensity.min(100),
        }
    }

    /// Command grammar: `<audio|led>;<side>;<attribute>;<intensity>;<durationMs>`.
    pub fn trigger<E: EventSink>(
        &mut self,
        events: &mut E,
        modality: Modality,
        stimulus: StimulusSpec,
        duration_s: f32,
    ) {
        let channel = match modality {
            Modality::Audio => "audio",
            Modality::Visual => "led",
            Modality::None => return,
        };
        let duration_ms = (duration_s * 1000.0).round() as u32;

        let command = format!(
            "{};{};{};{};{}",
            channel,
            stimulus.side.label(),
            stimulus.attribute.label(),
            self.intensity,
            duration_ms
        );
        debug!(%command, "triggering stimulus");
        self.actuator.send(&command);

        events.write(&format!(
            "stimulusTriggered:{stimulus};channel:{channel};durationMs:{duration_ms}"
        ));
    }
}
