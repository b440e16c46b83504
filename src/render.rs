//! Text and JSON output for patterns, node listings and rendered events

use crate::document::Project;
use anyhow::Result;
use colored::*;
use midiflow_core::types::time::to_f64;
use midiflow_core::{
    MidiEvent, NodeKind, Pattern, PlaybackConfig, TickEvent, Time, TimedEvent,
};
use serde::Serialize;

/// Seconds from the window start at which `t` plays
pub fn seconds(t: Time, config: &PlaybackConfig) -> f64 {
    // One whole note is four quarters
    (to_f64(t) - to_f64(config.start_time)) * 4.0 * config.tempo as f64 / 1_000_000.0
}

pub fn format_pattern(pattern: &Pattern) -> String {
    let mut out = format!(
        "{} {} note(s), duration {}\n",
        "pattern".bright_cyan().bold(),
        pattern.len(),
        pattern.duration().to_string().yellow()
    );
    for (start, note) in pattern.iter() {
        out.push_str(&format!(
            "  {:>8}  {:<4} dur {:<6} vel {}\n",
            start.to_string().yellow(),
            note.name().bright_green(),
            note.duration().to_string(),
            note.velocity()
        ));
    }
    out
}

pub fn format_nodes(project: &Project) -> String {
    let mut out = String::new();
    for (name, id) in project.names() {
        let Some(node) = project.flow.node(id) else {
            continue;
        };
        let detail = match node.kind() {
            NodeKind::Source(pattern) => format!(
                "source, {} note(s), duration {}",
                pattern.len(),
                pattern.duration()
            ),
            NodeKind::Transform(modifier) => {
                let inputs: Vec<&str> = node
                    .inputs()
                    .iter()
                    .map(|input| project.name_of(*input).unwrap_or("?"))
                    .collect();
                format!("{} <- {}", modifier, inputs.join(", "))
            }
        };
        let cached = if project.flow.is_cached(id) {
            " (cached)".dimmed().to_string()
        } else {
            String::new()
        };
        out.push_str(&format!(
            "{:>4}  {:<12} {}{}\n",
            id.to_string().dimmed(),
            name.bright_green(),
            detail,
            cached
        ));
    }
    out
}

pub fn format_events(events: &[TimedEvent], config: &PlaybackConfig) -> String {
    let mut out = String::new();
    for event in events {
        let label = match event.event {
            MidiEvent::NoteOn { .. } => event.event.to_string().bright_green(),
            MidiEvent::NoteOff { .. } => event.event.to_string().normal(),
            MidiEvent::ProgramChange { .. } => event.event.to_string().bright_magenta(),
        };
        out.push_str(&format!(
            "{:>8} {:>8.3}s  ch{:<2} {}\n",
            event.time.to_string().yellow(),
            seconds(event.time, config),
            event.channel,
            label
        ));
    }
    out
}

pub fn format_ticks(ticks: &[TickEvent]) -> String {
    ticks.iter().map(|tick| format!("{}\n", tick)).collect()
}

/// One rendered event as written to JSON, with the time kept exact
#[derive(Debug, Serialize)]
struct EventRecord<'a> {
    time: String,
    seconds: f64,
    channel: u8,
    #[serde(flatten)]
    event: &'a MidiEvent,
}

pub fn events_json(events: &[TimedEvent], config: &PlaybackConfig) -> Result<String> {
    let records: Vec<EventRecord> = events
        .iter()
        .map(|event| EventRecord {
            time: event.time.to_string(),
            seconds: seconds(event.time, config),
            channel: event.channel,
            event: &event.event,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

pub fn ticks_json(ticks: &[TickEvent]) -> Result<String> {
    Ok(serde_json::to_string_pretty(ticks)?)
}
