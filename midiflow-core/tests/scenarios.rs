//! End-to-end scenarios: patterns through a flow onto a timeline.

use midiflow_core::timeline::to_ticks;
use midiflow_core::types::time::{time, whole, ZERO};
use midiflow_core::{
    MidiEvent, Modifier, Note, Pattern, PatternFlow, PlaybackConfig, Time, Timeline,
    ValidationError,
};

/// Eighth-note pulse of quarter-length notes, one per pitch
fn line(pitches: &[u8]) -> Pattern {
    let notes = pitches.iter().enumerate().map(|(i, pitch)| {
        (
            time(i as i64, 8),
            Note::new(time(1, 4), *pitch, 100).unwrap(),
        )
    });
    Pattern::from_notes(notes, time(pitches.len() as i64, 8)).unwrap()
}

#[test]
fn test_occupied_slot_then_remove() {
    let c = Note::new(time(1, 4), 60, 100).unwrap();
    let e = Note::new(time(1, 4), 64, 100).unwrap();
    let p = Pattern::from_notes(vec![(ZERO, c), (time(1, 4), e)], time(1, 2)).unwrap();

    assert_eq!(
        p.insert(time(1, 4), c).unwrap_err(),
        ValidationError::OccupiedSlot { start: time(1, 4) }
    );
    let freed = p.remove(time(1, 4)).unwrap();
    let refilled = freed.insert(time(1, 4), c).unwrap();
    assert_eq!(refilled.get(time(1, 4)), Some(&c));
    assert_eq!(refilled.duration(), time(1, 2));
}

#[test]
fn test_arranged_phrase() {
    let mut flow = PatternFlow::new();
    let first = flow.add_source(line(&[60, 65, 67, 70, 67, 65]));
    let second = flow.add_source(line(&[62, 63, 62, 58]));
    let phrase = flow
        .add_transform(Modifier::Concatenate, &[first, first, first, second])
        .unwrap();
    let backwards = flow.add_transform(Modifier::Reverse, &[phrase]).unwrap();
    let mirrored = flow
        .add_transform(Modifier::invert(60).unwrap(), &[backwards])
        .unwrap();
    let full = flow
        .add_transform(Modifier::Concatenate, &[phrase, mirrored])
        .unwrap();

    let phrase_out = flow.evaluate(phrase).unwrap();
    // Three 6/8 lines then a 4/8 line, where the trailing notes ring one
    // eighth past each line's nominal length
    assert_eq!(phrase_out.len(), 22);
    let full_out = flow.evaluate(full).unwrap();
    assert_eq!(full_out.len(), 44);
    assert_eq!(full_out.duration(), phrase_out.duration() * whole(2));

    let mut timeline = Timeline::new();
    timeline.place_node(ZERO, 0, full).unwrap();
    timeline.place_program(time(11, 4), 0, 40).unwrap();
    let config = PlaybackConfig::default();
    let events = timeline.render(&flow, &config).unwrap();

    let ons = events
        .iter()
        .filter(|e| matches!(e.event, MidiEvent::NoteOn { .. }))
        .count();
    let offs = events
        .iter()
        .filter(|e| matches!(e.event, MidiEvent::NoteOff { .. }))
        .count();
    assert_eq!(ons, 44);
    assert_eq!(offs, 44);
    assert!(events.contains(&midiflow_core::TimedEvent::new(
        time(11, 4),
        0,
        MidiEvent::ProgramChange { program: 40 }
    )));

    let ticks = to_ticks(&events, &config).unwrap();
    let total: u64 = ticks.iter().map(|t| t.delta).sum();
    let end: Time = events.last().unwrap().time;
    assert_eq!(
        total,
        midiflow_core::types::time::time_to_ticks(end, config.ppq).unwrap()
    );
}

#[test]
fn test_cycle_rejected_end_to_end() {
    let mut flow = PatternFlow::new();
    let src = flow.add_source(line(&[60]));
    let a = flow.add_transform(Modifier::Reverse, &[src]).unwrap();
    let b = flow.add_transform(Modifier::Reverse, &[a]).unwrap();
    let snapshot = flow.clone();

    assert!(matches!(
        flow.rewire(a, &[b]),
        Err(ValidationError::Cycle { .. })
    ));
    assert_eq!(flow.inputs(a).unwrap(), snapshot.inputs(a).unwrap());
    assert_eq!(flow.dependents(b).unwrap(), snapshot.dependents(b).unwrap());
    assert_eq!(flow.evaluate(b).unwrap(), line(&[60]));
}
