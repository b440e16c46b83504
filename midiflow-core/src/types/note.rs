//! A single sounding note.

use crate::error::{Result, ValidationError};
use crate::types::time::{time, Time};
use num_traits::Zero;
use std::fmt;

/// Highest value a MIDI data byte can hold
pub const MIDI_MAX: u8 = 127;

/// An immutable note value: how long it sounds, which key, how hard.
///
/// Construct through [`Note::new`] so the ranges are checked; the fields are
/// read-only from outside the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawNote", into = "RawNote"))]
pub struct Note {
    duration: Time,
    pitch: u8,
    velocity: u8,
}

impl Note {
    /// Create a note, rejecting non-positive durations and out-of-range bytes
    pub fn new(duration: Time, pitch: u8, velocity: u8) -> Result<Self> {
        if duration <= Time::zero() {
            return Err(ValidationError::InvalidNote(format!(
                "duration must be positive, got {}",
                duration
            )));
        }
        if pitch > MIDI_MAX {
            return Err(ValidationError::InvalidNote(format!(
                "pitch {} out of range 0-127",
                pitch
            )));
        }
        if velocity > MIDI_MAX {
            return Err(ValidationError::InvalidNote(format!(
                "velocity {} out of range 0-127",
                velocity
            )));
        }
        Ok(Self {
            duration,
            pitch,
            velocity,
        })
    }

    pub fn duration(&self) -> Time {
        self.duration
    }

    /// MIDI note number (60 = middle C)
    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn with_duration(self, duration: Time) -> Result<Self> {
        Note::new(duration, self.pitch, self.velocity)
    }

    pub fn with_pitch(self, pitch: u8) -> Result<Self> {
        Note::new(self.duration, pitch, self.velocity)
    }

    pub fn with_velocity(self, velocity: u8) -> Result<Self> {
        Note::new(self.duration, self.pitch, velocity)
    }

    /// Pitch moved by `semitones`, pinned to the MIDI range
    pub(crate) fn transposed(self, semitones: i16) -> Self {
        Self {
            pitch: clamp_midi(self.pitch as i16 + semitones),
            ..self
        }
    }

    pub(crate) fn with_clamped_pitch(self, pitch: i16) -> Self {
        Self {
            pitch: clamp_midi(pitch),
            ..self
        }
    }

    pub(crate) fn with_clamped_velocity(self, velocity: i64) -> Self {
        Self {
            velocity: velocity.clamp(0, MIDI_MAX as i64) as u8,
            ..self
        }
    }

    /// Scientific pitch name, e.g. "C4" or "F#2"
    pub fn name(&self) -> String {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        let octave = self.pitch as i16 / 12 - 1;
        format!("{}{}", NAMES[(self.pitch % 12) as usize], octave)
    }
}

impl Default for Note {
    /// A quarter-note middle C at medium velocity
    fn default() -> Self {
        Self {
            duration: time(1, 4),
            pitch: 60,
            velocity: 64,
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) v{}", self.name(), self.duration, self.velocity)
    }
}

fn clamp_midi(value: i16) -> u8 {
    value.clamp(0, MIDI_MAX as i16) as u8
}

/// Unchecked wire form; converted through [`Note::new`] on the way in.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawNote {
    duration: Time,
    pitch: u8,
    velocity: u8,
}

#[cfg(feature = "serde")]
impl TryFrom<RawNote> for Note {
    type Error = ValidationError;

    fn try_from(raw: RawNote) -> Result<Self> {
        Note::new(raw.duration, raw.pitch, raw.velocity)
    }
}

#[cfg(feature = "serde")]
impl From<Note> for RawNote {
    fn from(note: Note) -> Self {
        RawNote {
            duration: note.duration,
            pitch: note.pitch,
            velocity: note.velocity,
        }
    }
}
