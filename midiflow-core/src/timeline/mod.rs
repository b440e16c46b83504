//! Timeline: places flow outputs and program changes on a (time, channel) grid
//!
//! A timeline only stores node ids. Rendering asks the flow for each placed
//! node's pattern, so edits to the flow show up in the next render without
//! touching the timeline.

mod config;
mod event;
mod import;

pub use config::{PlaybackConfig, CHANNELS};
pub use event::{MidiEvent, TickEvent, TickMessage, TimedEvent};

use crate::error::{Result, ValidationError};
use crate::flow::{NodeId, PatternFlow};
use crate::types::note::MIDI_MAX;
use crate::types::time::{is_negative, time_to_ticks, try_add, try_sub, Time};
use crate::types::Pattern;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Instrument selection marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgramChange {
    program: u8,
}

impl ProgramChange {
    pub fn new(program: u8) -> Result<Self> {
        if program > MIDI_MAX {
            return Err(ValidationError::InvalidProgram(program));
        }
        Ok(Self { program })
    }

    pub fn program(&self) -> u8 {
        self.program
    }
}

/// What sits at a grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanvasItem {
    Node(NodeId),
    Program(ProgramChange),
}

/// One entry of the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    pub time: Time,
    pub channel: u8,
    pub item: CanvasItem,
}

/// An arrangement of flow nodes and program changes over time and channels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    canvas: Vec<Placement>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in placement order
    pub fn canvas(&self) -> &[Placement] {
        &self.canvas
    }

    pub fn len(&self) -> usize {
        self.canvas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canvas.is_empty()
    }

    /// Play the output of `node` starting at `time` on `channel`
    pub fn place_node(&mut self, time: Time, channel: u8, node: NodeId) -> Result<()> {
        self.place(time, channel, CanvasItem::Node(node))
    }

    /// Switch `channel` to `program` at `time`
    pub fn place_program(&mut self, time: Time, channel: u8, program: u8) -> Result<()> {
        let change = ProgramChange::new(program)?;
        self.place(time, channel, CanvasItem::Program(change))
    }

    fn place(&mut self, time: Time, channel: u8, item: CanvasItem) -> Result<()> {
        if channel >= CHANNELS {
            return Err(ValidationError::InvalidChannel(channel));
        }
        if is_negative(time) {
            return Err(ValidationError::NegativeTime { time });
        }
        self.canvas.push(Placement {
            time,
            channel,
            item,
        });
        Ok(())
    }

    /// Distinct nodes referenced by the canvas, in id order
    pub fn nodes(&self) -> BTreeSet<NodeId> {
        self.canvas
            .iter()
            .filter_map(|placement| match placement.item {
                CanvasItem::Node(node) => Some(node),
                CanvasItem::Program(_) => None,
            })
            .collect()
    }

    /// Channels with at least one placement
    pub fn channels(&self) -> BTreeSet<u8> {
        self.canvas.iter().map(|placement| placement.channel).collect()
    }

    /// Render to a time-ordered event list.
    ///
    /// Notes whose onset lies in the config window produce a note-on and a
    /// note-off; the note-off is kept even when it falls past the window end.
    /// Every used channel starts with the program in effect at the window
    /// start: the last placed change at or before it, else the channel's
    /// default.
    pub fn render(&self, flow: &PatternFlow, config: &PlaybackConfig) -> Result<Vec<TimedEvent>> {
        config.validate()?;
        let patterns = self.evaluate(flow)?;
        let mut events = Vec::new();

        for channel in self.channels() {
            let placed = self
                .canvas
                .iter()
                .filter(|placement| placement.channel == channel && placement.time <= config.start_time)
                .filter_map(|placement| match placement.item {
                    CanvasItem::Program(change) => Some((placement.time, change.program())),
                    CanvasItem::Node(_) => None,
                })
                .max_by_key(|(time, _)| *time)
                .map(|(_, program)| program);
            if let Some(program) = placed.or_else(|| config.default_programs.get(&channel).copied()) {
                events.push(TimedEvent::new(
                    config.start_time,
                    channel,
                    MidiEvent::ProgramChange { program },
                ));
            }
        }

        for placement in &self.canvas {
            match placement.item {
                CanvasItem::Node(node) => {
                    let Some(pattern) = patterns.get(&node) else {
                        continue;
                    };
                    for (start, note) in pattern.iter() {
                        let onset = try_add(placement.time, start)?;
                        if !config.in_window(onset) {
                            continue;
                        }
                        events.push(TimedEvent::new(
                            onset,
                            placement.channel,
                            MidiEvent::NoteOn {
                                pitch: note.pitch(),
                                velocity: note.velocity(),
                            },
                        ));
                        events.push(TimedEvent::new(
                            try_add(onset, note.duration())?,
                            placement.channel,
                            MidiEvent::NoteOff {
                                pitch: note.pitch(),
                                velocity: note.velocity(),
                            },
                        ));
                    }
                }
                CanvasItem::Program(change) => {
                    // Changes at or before the start are folded into the
                    // channel's initial program above
                    if placement.time > config.start_time && config.in_window(placement.time) {
                        events.push(TimedEvent::new(
                            placement.time,
                            placement.channel,
                            MidiEvent::ProgramChange {
                                program: change.program(),
                            },
                        ));
                    }
                }
            }
        }

        events.sort_by(TimedEvent::playback_order);
        debug!(
            "rendered {} placement(s) into {} event(s)",
            self.canvas.len(),
            events.len()
        );
        Ok(events)
    }

    /// Render straight to a delta-tick stream
    pub fn render_ticks(&self, flow: &PatternFlow, config: &PlaybackConfig) -> Result<Vec<TickEvent>> {
        let events = self.render(flow, config)?;
        to_ticks(&events, config)
    }

    fn evaluate(&self, flow: &PatternFlow) -> Result<BTreeMap<NodeId, Pattern>> {
        let nodes: Vec<NodeId> = self.nodes().into_iter().collect();
        nodes
            .iter()
            .copied()
            .zip(flow.evaluate_all(&nodes))
            .map(|(node, result)| result.map(|pattern| (node, pattern)))
            .collect()
    }
}

/// Convert rendered events to delta ticks, after a leading set-tempo event.
///
/// Ticks are counted from the config's start time. Each delta is taken
/// between rounded absolute positions, so rounding error never accumulates.
pub fn to_ticks(events: &[TimedEvent], config: &PlaybackConfig) -> Result<Vec<TickEvent>> {
    let mut ticks = Vec::with_capacity(events.len() + 1);
    ticks.push(TickEvent {
        delta: 0,
        message: TickMessage::Tempo(config.tempo),
    });
    let mut previous = 0;
    for event in events {
        let absolute = time_to_ticks(try_sub(event.time, config.start_time)?, config.ppq)?;
        ticks.push(TickEvent {
            delta: absolute.saturating_sub(previous),
            message: TickMessage::Channel {
                channel: event.channel,
                event: event.event,
            },
        });
        previous = previous.max(absolute);
    }
    Ok(ticks)
}
