use crate::condition::Modality;
use std::fmt;
use std::str::FromStr;

/// Defines the stimulus vocabulary. Specs are built once at startup and
/// passed around as values; nothing re-parses stimulus names at runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Second stimulus dimension: pitch for audio, color for visual.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StimulusAttribute {
    High,
    Low,
    Yellow,
    Blue,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StimulusSpec {
    pub side: Side,
    pub attribute: StimulusAttribute,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl FromStr for Side {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            _ => Err(()),
        }
    }
}

impl StimulusAttribute {
    pub fn label(self) -> &'static str {
        match self {
            StimulusAttribute::High => "high",
            StimulusAttribute::Low => "low",
            StimulusAttribute::Yellow => "yellow",
            StimulusAttribute::Blue => "blue",
        }
    }
}

impl fmt::Display for StimulusSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.side.label(), self.attribute.label())
    }
}

const fn spec(side: Side, attribute: StimulusAttribute) -> StimulusSpec {
    StimulusSpec { side, attribute }
}

/// left_high, left_low, right_high, right_low
pub const AUDIO_STIMULI: [StimulusSpec; 4] = [
    spec(Side::Left, StimulusAttribute::High),
    spec(Side::Left, StimulusAttribute::Low),
    spec(Side::Right, StimulusAttribute::High),
    spec(Side::Right, StimulusAttribute::Low),
];

/// left_yellow, left_blue, right_yellow, right_blue
pub const VISUAL_STIMULI: [StimulusSpec; 4] = [
    spec(Side::Left, StimulusAttribute::Yellow),
    spec(Side::Left, StimulusAttribute::Blue),
    spec(Side::Right, StimulusAttribute::Yellow),
    spec(Side::Right, StimulusAttribute::Blue),
];

/// The fixed 4-element stimulus table for a modality, if it has one.
pub fn stimulus_table(modality: Modality) -> Option<&'static [StimulusSpec; 4]> {
    match modality {
        Modality::Audio => Some(&AUDIO_STIMULI),
        Modality::Visual => Some(&VISUAL_STIMULI),
        Modality::None => None,
    }
}
