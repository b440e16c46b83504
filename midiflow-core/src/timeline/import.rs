//! Reading delta-tick streams back into patterns.

use super::event::{MidiEvent, TickEvent, TickMessage};
use crate::error::{Result, ValidationError};
use crate::types::note::Note;
use crate::types::time::{ticks_to_time, try_sub, Time};
use crate::types::Pattern;
use log::debug;
use std::collections::BTreeMap;

/// A note-on still waiting for its release
struct Sounding {
    start: Time,
    velocity: u8,
}

impl Pattern {
    /// Collect the notes of a delta-tick stream at `ppq` into one pattern.
    ///
    /// Each note-on is paired with the next note-off (or zero-velocity
    /// note-on) of the same pitch on the same channel. A repeated note-on
    /// closes the note already sounding. Notes still sounding when the stream
    /// ends are closed there. Channels are merged, so two notes starting at
    /// the same tick are an overlap; tempo and program changes only advance
    /// time. A note released on the tick it started is rejected as an
    /// invalid note. The pattern lasts until the last event.
    pub fn from_ticks(events: &[TickEvent], ppq: u16) -> Result<Pattern> {
        let mut sounding: BTreeMap<(u8, u8), Sounding> = BTreeMap::new();
        let mut notes: Vec<(Time, Note)> = Vec::new();
        let mut ticks: u64 = 0;
        let mut now = ticks_to_time(0, ppq)?;

        for event in events {
            ticks = ticks.checked_add(event.delta).ok_or_else(|| {
                ValidationError::TimeOverflow(format!("{} + {} ticks", ticks, event.delta))
            })?;
            now = ticks_to_time(ticks, ppq)?;

            let TickMessage::Channel { channel, event } = event.message else {
                continue;
            };
            match event {
                MidiEvent::NoteOn { pitch, velocity } if velocity > 0 => {
                    if let Some(held) = sounding.remove(&(channel, pitch)) {
                        notes.push(close(held, pitch, now)?);
                    }
                    sounding.insert((channel, pitch), Sounding { start: now, velocity });
                }
                MidiEvent::NoteOn { pitch, .. } | MidiEvent::NoteOff { pitch, .. } => {
                    if let Some(held) = sounding.remove(&(channel, pitch)) {
                        notes.push(close(held, pitch, now)?);
                    }
                }
                MidiEvent::ProgramChange { .. } => {}
            }
        }

        for ((_, pitch), held) in sounding {
            notes.push(close(held, pitch, now)?);
        }
        debug!("imported {} note(s) from {} tick event(s)", notes.len(), events.len());
        Pattern::collect(notes, now)
    }
}

fn close(held: Sounding, pitch: u8, end: Time) -> Result<(Time, Note)> {
    let duration = try_sub(end, held.start)?;
    Ok((held.start, Note::new(duration, pitch, held.velocity)?))
}
