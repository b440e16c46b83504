//! Tests for the built-in modifiers.

use super::*;
use crate::types::time::{time, whole, ZERO};

fn n(duration: Time, pitch: u8, velocity: u8) -> Note {
    Note::new(duration, pitch, velocity).unwrap()
}

/// C4 E4 G4 as eighth notes, then an eighth of silence
fn triad() -> Pattern {
    Pattern::from_notes(
        vec![
            (ZERO, n(time(1, 8), 60, 100)),
            (time(1, 8), n(time(1, 8), 64, 90)),
            (time(1, 4), n(time(1, 8), 67, 80)),
        ],
        time(1, 2),
    )
    .unwrap()
}

fn pitches(p: &Pattern) -> Vec<u8> {
    p.notes().map(|note| note.pitch()).collect()
}

#[derive(Debug)]
struct Octaver;

impl CustomModifier for Octaver {
    fn name(&self) -> &str {
        "octaver"
    }

    fn arity(&self) -> Arity {
        Arity::Exactly(1)
    }

    fn forward(&self, inputs: &[Pattern]) -> Result<Pattern> {
        Modifier::transpose(12).apply(&inputs[0])
    }
}

#[test]
fn test_arity_accepts() {
    assert!(Arity::Exactly(1).accepts(1));
    assert!(!Arity::Exactly(1).accepts(2));
    assert!(Arity::AtLeast(2).accepts(5));
    assert!(!Arity::AtLeast(2).accepts(1));
    assert_eq!(Arity::AtLeast(2).to_string(), "at least 2");
}

#[test]
fn test_arity_checked_first() {
    let err = Modifier::transpose(2).forward(&[triad(), triad()]).unwrap_err();
    assert_eq!(
        err,
        ValidationError::Arity {
            modifier: "transpose".to_string(),
            expected: Arity::Exactly(1),
            actual: 2,
        }
    );
    let err = Modifier::Concatenate.forward(&[triad()]).unwrap_err();
    assert!(matches!(err, ValidationError::Arity { actual: 1, .. }));
}

#[test]
fn test_transpose() {
    let p = Modifier::transpose(-2).apply(&triad()).unwrap();
    assert_eq!(pitches(&p), vec![58, 62, 65]);
    assert_eq!(p.duration(), time(1, 2));

    let high = Modifier::transpose(100).apply(&triad()).unwrap();
    assert_eq!(pitches(&high), vec![127, 127, 127]);
}

#[test]
fn test_forward_does_not_touch_input() {
    let input = triad();
    let snapshot = input.clone();
    let _ = Modifier::transpose(5).apply(&input).unwrap();
    let _ = Modifier::Reverse.apply(&input).unwrap();
    assert_eq!(input, snapshot);
}

#[test]
fn test_forward_is_deterministic() {
    let m = Modifier::stretch(time(3, 2)).unwrap();
    assert_eq!(m.apply(&triad()).unwrap(), m.apply(&triad()).unwrap());
}

#[test]
fn test_invert() {
    let p = Modifier::invert(60).unwrap().apply(&triad()).unwrap();
    assert_eq!(pitches(&p), vec![60, 56, 53]);
    assert!(Modifier::invert(128).is_err());
}

#[test]
fn test_reverse() {
    let p = Modifier::Reverse.apply(&triad()).unwrap();
    // Each note now ends where it used to start, measured from the end
    assert_eq!(p.duration(), time(1, 2));
    assert_eq!(p.get(time(3, 8)).unwrap().pitch(), 60);
    assert_eq!(p.get(time(1, 4)).unwrap().pitch(), 64);
    assert_eq!(p.get(time(1, 8)).unwrap().pitch(), 67);
    // Reversing twice restores the pattern
    assert_eq!(Modifier::Reverse.apply(&p).unwrap(), triad());
}

#[test]
fn test_reverse_collision_is_overlap() {
    // Both notes end at 1/2, so both would start at 0 when reversed
    let p = Pattern::from_notes(
        vec![(ZERO, n(time(1, 2), 60, 1)), (time(1, 4), n(time(1, 4), 64, 1))],
        time(1, 2),
    )
    .unwrap();
    assert_eq!(
        Modifier::Reverse.apply(&p).unwrap_err(),
        ValidationError::Overlap { start: ZERO }
    );
}

#[test]
fn test_quantize() {
    let p = Pattern::from_notes(
        vec![
            (time(1, 10), n(time(1, 16), 60, 1)),
            (time(3, 10), n(time(1, 16), 62, 1)),
            (time(5, 8), n(time(1, 16), 64, 1)),
        ],
        whole(1),
    )
    .unwrap();
    let q = Modifier::quantize(time(1, 4)).unwrap().apply(&p).unwrap();
    let starts: Vec<Time> = q.iter().map(|(s, _)| s).collect();
    // 1/10 -> 0, 3/10 -> 1/4, 5/8 is a tie and rounds up to 3/4
    assert_eq!(starts, vec![ZERO, time(1, 4), time(3, 4)]);
    assert!(Modifier::quantize(ZERO).is_err());
}

#[test]
fn test_quantize_collision() {
    let p = Pattern::from_notes(
        vec![(ZERO, n(time(1, 32), 60, 1)), (time(1, 32), n(time(1, 32), 62, 1))],
        time(1, 4),
    )
    .unwrap();
    let err = Modifier::quantize(time(1, 4)).unwrap().apply(&p).unwrap_err();
    assert_eq!(err, ValidationError::Overlap { start: ZERO });
}

#[test]
fn test_stretch() {
    let p = Modifier::stretch(whole(2)).unwrap().apply(&triad()).unwrap();
    assert_eq!(p.duration(), whole(1));
    assert_eq!(p.get(time(1, 4)).unwrap().duration(), time(1, 4));
    assert!(p.contains(time(1, 2)));
    assert!(Modifier::stretch(ZERO).is_err());
}

#[test]
fn test_shift_and_slice() {
    let shifted = Modifier::shift(time(1, 8)).apply(&triad()).unwrap();
    assert_eq!(shifted, triad().shift(time(1, 8)).unwrap());

    let window = Modifier::slice(time(1, 8), None).unwrap().apply(&triad()).unwrap();
    assert_eq!(window.duration(), time(3, 8));
    assert_eq!(pitches(&window), vec![64, 67]);

    assert!(Modifier::slice(time(1, 2), Some(time(1, 4))).is_err());
    assert!(Modifier::slice(time(-1, 2), None).is_err());
}

#[test]
fn test_open_slice_past_the_end() {
    // `from` beyond the input leaves `to` (the input's duration) before it
    let slice = Modifier::slice(whole(1), None).unwrap();
    assert!(matches!(
        slice.apply(&triad()),
        Err(ValidationError::InvalidParameter { ref modifier, .. }) if modifier == "slice"
    ));
}

#[test]
fn test_scaling_reports_overflow() {
    let factor = time(1, i64::MAX);
    for modifier in [
        Modifier::stretch(factor).unwrap(),
        Modifier::scale_duration(factor).unwrap(),
    ] {
        assert!(
            matches!(modifier.apply(&triad()), Err(ValidationError::TimeOverflow(_))),
            "{} should overflow",
            modifier
        );
    }
    let loud = Modifier::scale_velocity(whole(i64::MAX)).unwrap();
    assert!(matches!(
        loud.apply(&triad()),
        Err(ValidationError::TimeOverflow(_))
    ));
}

#[test]
fn test_velocity_modifiers() {
    let half = Modifier::scale_velocity(time(1, 2)).unwrap().apply(&triad()).unwrap();
    let velocities: Vec<u8> = half.notes().map(|n| n.velocity()).collect();
    assert_eq!(velocities, vec![50, 45, 40]);

    let loud = Modifier::scale_velocity(whole(2)).unwrap().apply(&triad()).unwrap();
    assert!(loud.notes().all(|n| n.velocity() == 127));

    let flat = Modifier::set_velocity(33).unwrap().apply(&triad()).unwrap();
    assert!(flat.notes().all(|n| n.velocity() == 33));

    assert!(Modifier::scale_velocity(time(-1, 2)).is_err());
    assert!(Modifier::set_velocity(200).is_err());
}

#[test]
fn test_duration_modifiers_grow_pattern() {
    let legato = Modifier::scale_duration(whole(4)).unwrap().apply(&triad()).unwrap();
    // Last note: 1/4 + 1/2 = 3/4
    assert_eq!(legato.duration(), time(3, 4));

    let stacc = Modifier::set_duration(time(1, 32)).unwrap().apply(&triad()).unwrap();
    assert!(stacc.notes().all(|n| n.duration() == time(1, 32)));
    assert_eq!(stacc.duration(), time(1, 2));

    assert!(Modifier::set_duration(ZERO).is_err());
}

#[test]
fn test_concatenate() {
    let a = triad();
    let b = Modifier::transpose(12).apply(&a).unwrap();
    let c = Modifier::Concatenate.forward(&[a.clone(), b.clone(), a.clone()]).unwrap();
    assert_eq!(c.duration(), time(3, 2));
    assert_eq!(c.len(), 9);
    assert_eq!(c, a.concat(&b).unwrap().concat(&a).unwrap());
}

#[test]
fn test_merge() {
    let a = triad();
    let b = Modifier::shift(time(1, 16)).apply(&a).unwrap();
    let m = Modifier::merge(OverlapPolicy::Fail).forward(&[a.clone(), b]).unwrap();
    assert_eq!(m.len(), 6);
    assert_eq!(m.duration(), time(9, 16));

    let clash = Modifier::merge(OverlapPolicy::Fail).forward(&[a.clone(), a.clone()]);
    assert!(matches!(clash, Err(ValidationError::Overlap { .. })));

    let up = Modifier::transpose(1).apply(&a).unwrap();
    let last = Modifier::merge(OverlapPolicy::KeepLast)
        .forward(&[a.clone(), up.clone()])
        .unwrap();
    assert_eq!(last, up);
}

#[test]
fn test_equality_is_kind_and_parameters() {
    assert_eq!(Modifier::transpose(2), Modifier::transpose(2));
    assert_ne!(Modifier::transpose(2), Modifier::transpose(3));
    assert_ne!(Modifier::Reverse, Modifier::Concatenate);
    assert_eq!(Modifier::custom(Octaver), Modifier::custom(Octaver));
}

#[test]
fn test_custom_modifier() {
    let m = Modifier::custom(Octaver);
    assert_eq!(m.name(), "octaver");
    assert_eq!(m.arity(), Arity::Exactly(1));
    let p = m.apply(&triad()).unwrap();
    assert_eq!(pitches(&p), vec![72, 76, 79]);
    assert!(m.forward(&[]).is_err());
}

#[test]
fn test_display() {
    assert_eq!(Modifier::transpose(3).to_string(), "transpose(+3)");
    assert_eq!(Modifier::quantize(time(1, 16)).unwrap().to_string(), "quantize(1/16)");
    assert_eq!(Modifier::merge(OverlapPolicy::KeepFirst).to_string(), "merge(keep_first)");
    assert_eq!(Modifier::Reverse.to_string(), "reverse");
}

#[cfg(feature = "serde")]
#[test]
fn test_serde_tagging() {
    let m: Modifier = serde_json::from_str(r#"{"kind":"transpose","semitones":-3}"#).unwrap();
    assert_eq!(m, Modifier::transpose(-3));
    let m: Modifier = serde_json::from_str(r#"{"kind":"merge"}"#).unwrap();
    assert_eq!(m, Modifier::merge(OverlapPolicy::Fail));
}
