//! Rendered MIDI events, in rational time and in delta ticks.

use crate::types::time::Time;
use std::cmp::Ordering;
use std::fmt;

/// A channel message produced by rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum MidiEvent {
    NoteOff { pitch: u8, velocity: u8 },
    ProgramChange { program: u8 },
    NoteOn { pitch: u8, velocity: u8 },
}

impl MidiEvent {
    /// Order among events sharing a time and channel: releases first, so a
    /// repeated pitch is not cut short, then instrument changes, then onsets
    fn rank(&self) -> u8 {
        match self {
            MidiEvent::NoteOff { .. } => 0,
            MidiEvent::ProgramChange { .. } => 1,
            MidiEvent::NoteOn { .. } => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MidiEvent::NoteOff { .. } => "note_off",
            MidiEvent::ProgramChange { .. } => "program_change",
            MidiEvent::NoteOn { .. } => "note_on",
        }
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiEvent::NoteOn { pitch, velocity } | MidiEvent::NoteOff { pitch, velocity } => {
                write!(f, "{} pitch={} velocity={}", self.name(), pitch, velocity)
            }
            MidiEvent::ProgramChange { program } => write!(f, "{} program={}", self.name(), program),
        }
    }
}

/// An event at an absolute time on one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimedEvent {
    pub time: Time,
    pub channel: u8,
    pub event: MidiEvent,
}

impl TimedEvent {
    pub fn new(time: Time, channel: u8, event: MidiEvent) -> Self {
        Self {
            time,
            channel,
            event,
        }
    }

    /// Sort key: time, then channel, then event rank
    pub fn playback_order(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then(self.channel.cmp(&other.channel))
            .then(self.event.rank().cmp(&other.event.rank()))
    }
}

/// Payload of a tick-stream event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TickMessage {
    /// Set-tempo meta event, microseconds per quarter note
    Tempo(u32),
    Channel { channel: u8, event: MidiEvent },
}

/// An event positioned by ticks since the previous one, ready for a
/// standard MIDI file track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickEvent {
    pub delta: u64,
    pub message: TickMessage,
}

impl fmt::Display for TickEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            TickMessage::Tempo(tempo) => write!(f, "+{} set_tempo tempo={}", self.delta, tempo),
            TickMessage::Channel { channel, event } => {
                write!(f, "+{} ch{} {}", self.delta, channel, event)
            }
        }
    }
}
