//! Core Pattern struct and implementation.

use crate::error::{Result, ValidationError};
use crate::modifier::OverlapPolicy;
use crate::types::note::Note;
use crate::types::time::{is_negative, try_add, try_sub, Time, TimeSpan, ZERO};
use im::OrdMap;
use std::fmt;

/// An immutable, time-ordered sequence of notes with an explicit duration.
///
/// Invariants, upheld by every constructor and edit:
/// - at most one note per start time
/// - every start time lies in `[0, duration)`
/// - `duration >= start + note.duration` for every entry
///
/// Edits return a new `Pattern`. The notes live in a persistent B-tree, so an
/// edit shares all untouched nodes with its source and a clone is O(1); many
/// flow nodes may hold the same pattern without copying it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pattern {
    notes: OrdMap<Time, Note>,
    duration: Time,
}

impl Pattern {
    /// Create an empty pattern of the given length (trailing silence)
    pub fn new(duration: Time) -> Result<Self> {
        if is_negative(duration) {
            return Err(ValidationError::InvalidDuration {
                duration,
                reason: "pattern duration cannot be negative".to_string(),
            });
        }
        Ok(Pattern {
            notes: OrdMap::new(),
            duration,
        })
    }

    /// The empty, zero-length pattern
    pub fn empty() -> Self {
        Pattern {
            notes: OrdMap::new(),
            duration: ZERO,
        }
    }

    /// Build a pattern from `(start, note)` pairs.
    ///
    /// `duration` is a lower bound; it grows to cover the last note. Fails on
    /// a repeated start time or a negative one.
    pub fn from_notes<I>(notes: I, duration: Time) -> Result<Self>
    where
        I: IntoIterator<Item = (Time, Note)>,
    {
        let mut pattern = Pattern::new(duration)?;
        for (start, note) in notes {
            pattern.insert_mut(start, note)?;
        }
        Ok(pattern)
    }

    /// Assemble a pattern from transformed entries, reporting collisions as
    /// overlaps rather than occupied slots.
    pub(crate) fn collect<I>(entries: I, duration: Time) -> Result<Self>
    where
        I: IntoIterator<Item = (Time, Note)>,
    {
        let mut pattern = Pattern::new(duration)?;
        for (start, note) in entries {
            pattern.insert_mut(start, note).map_err(|err| match err {
                ValidationError::OccupiedSlot { start } => ValidationError::Overlap { start },
                other => other,
            })?;
        }
        Ok(pattern)
    }

    fn insert_mut(&mut self, start: Time, note: Note) -> Result<()> {
        if is_negative(start) {
            return Err(ValidationError::NegativeTime { time: start });
        }
        if self.notes.contains_key(&start) {
            return Err(ValidationError::OccupiedSlot { start });
        }
        let end = try_add(start, note.duration())?;
        if end > self.duration {
            self.duration = end;
        }
        self.notes.insert(start, note);
        Ok(())
    }

    /// Overall length, including trailing silence
    pub fn duration(&self) -> Time {
        self.duration
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// The note starting exactly at `start`
    pub fn get(&self, start: Time) -> Option<&Note> {
        self.notes.get(&start)
    }

    pub fn contains(&self, start: Time) -> bool {
        self.notes.contains_key(&start)
    }

    /// Earliest entry
    pub fn first(&self) -> Option<(Time, &Note)> {
        self.notes.get_min().map(|(start, note)| (*start, note))
    }

    /// Latest entry
    pub fn last(&self) -> Option<(Time, &Note)> {
        self.notes.get_max().map(|(start, note)| (*start, note))
    }

    /// Onset of the first note, or zero for an empty pattern
    pub fn start_time(&self) -> Time {
        self.first().map(|(start, _)| start).unwrap_or(ZERO)
    }

    /// Latest release time of any note, or zero for an empty pattern
    pub fn end_time(&self) -> Time {
        // Each sum was already computed, checked, when the note was placed
        self.iter()
            .map(|(start, note)| start + note.duration())
            .max()
            .unwrap_or(ZERO)
    }

    /// Entries in ascending start order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: Box::new(self.notes.iter()),
        }
    }

    /// Entries whose start lies in `[span.start, span.end)`, ascending
    pub fn range(&self, span: TimeSpan) -> Iter<'_> {
        if span.is_empty() {
            return Iter {
                inner: Box::new(std::iter::empty()),
            };
        }
        Iter {
            inner: Box::new(self.notes.range(span.start..span.end)),
        }
    }

    /// Just the notes, in start order
    pub fn notes(&self) -> impl DoubleEndedIterator<Item = &Note> + '_ {
        self.iter().map(|(_, note)| note)
    }

    /// Add `note` at `start`. Fails if a note already starts there.
    pub fn insert(&self, start: Time, note: Note) -> Result<Self> {
        let mut next = self.clone();
        next.insert_mut(start, note)?;
        Ok(next)
    }

    /// Drop the note at `start`. The duration is kept: silence is meaningful.
    pub fn remove(&self, start: Time) -> Result<Self> {
        if !self.notes.contains_key(&start) {
            return Err(ValidationError::NotFound { start });
        }
        Ok(Pattern {
            notes: self.notes.without(&start),
            duration: self.duration,
        })
    }

    /// Move every note by `delta`, growing or shrinking the leading silence.
    ///
    /// The duration moves with the notes, so shifts compose additively.
    pub fn shift(&self, delta: Time) -> Result<Self> {
        let duration = try_add(self.duration, delta)?;
        if is_negative(duration) {
            return Err(ValidationError::NegativeTime { time: duration });
        }
        if let Some((first, _)) = self.first() {
            let moved = try_add(first, delta)?;
            if is_negative(moved) {
                return Err(ValidationError::NegativeTime { time: moved });
            }
        }
        if delta == ZERO {
            return Ok(self.clone());
        }
        let notes = self
            .iter()
            .map(|(start, note)| Ok((try_add(start, delta)?, *note)))
            .collect::<Result<OrdMap<Time, Note>>>()?;
        Ok(Pattern { notes, duration })
    }

    /// The window `[from, to)`, re-based so `from` becomes zero.
    ///
    /// Notes ringing past the window end are shortened to end with it.
    pub fn slice(&self, from: Time, to: Time) -> Result<Self> {
        if is_negative(from) {
            return Err(ValidationError::NegativeTime { time: from });
        }
        if to < from {
            return Err(ValidationError::InvalidDuration {
                duration: try_sub(to, from)?,
                reason: format!("slice end {} is before its start {}", to, from),
            });
        }
        let length = try_sub(to, from)?;
        let mut notes = OrdMap::new();
        for (start, note) in self.range(TimeSpan::new(from, to)) {
            let offset = try_sub(start, from)?;
            let note = if try_add(offset, note.duration())? > length {
                note.with_duration(try_sub(length, offset)?)?
            } else {
                *note
            };
            notes.insert(offset, note);
        }
        Ok(Pattern {
            notes,
            duration: length,
        })
    }

    /// Append `other` after this pattern's full duration.
    ///
    /// Fails only if the combined times no longer fit in [`Time`].
    pub fn concat(&self, other: &Pattern) -> Result<Self> {
        let offset = self.duration;
        let duration = try_add(self.duration, other.duration)?;
        let mut notes = self.notes.clone();
        for (start, note) in other.iter() {
            // Every start in `self` is below `offset`, so keys never collide
            notes.insert(try_add(start, offset)?, *note);
        }
        Ok(Pattern { notes, duration })
    }

    /// Overlay `other` on this pattern, both starting at zero.
    ///
    /// The result lasts as long as the longer input. Notes sharing a start
    /// time are resolved by `policy`.
    pub fn merge(&self, other: &Pattern, policy: OverlapPolicy) -> Result<Self> {
        let mut notes = self.notes.clone();
        for (start, note) in other.iter() {
            if notes.contains_key(&start) {
                match policy {
                    OverlapPolicy::Fail => return Err(ValidationError::Overlap { start }),
                    OverlapPolicy::KeepFirst => continue,
                    OverlapPolicy::KeepLast => {}
                }
            }
            notes.insert(start, *note);
        }
        Ok(Pattern {
            notes,
            duration: self.duration.max(other.duration),
        })
    }

    /// Same notes, different amount of trailing silence
    pub fn with_duration(&self, duration: Time) -> Result<Self> {
        let end = self.end_time();
        if duration < end {
            return Err(ValidationError::InvalidDuration {
                duration,
                reason: format!("notes run until {}", end),
            });
        }
        Ok(Pattern {
            notes: self.notes.clone(),
            duration,
        })
    }

    /// Rewrite every note, keeping start times.
    ///
    /// The duration grows if a rewritten note now rings past the end.
    pub(crate) fn map_notes<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(&Note) -> Result<Note>,
    {
        let mut duration = self.duration;
        let mut notes = OrdMap::new();
        for (start, note) in self.iter() {
            let note = f(note)?;
            duration = duration.max(try_add(start, note.duration())?);
            notes.insert(start, note);
        }
        Ok(Pattern { notes, duration })
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::empty()
    }
}

/// Ordered iterator over `(start, note)` entries.
///
/// Borrowing and finite; call [`Pattern::iter`] again to restart.
pub struct Iter<'a> {
    inner: Box<dyn DoubleEndedIterator<Item = (&'a Time, &'a Note)> + 'a>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (Time, &'a Note);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(start, note)| (*start, note))
    }
}

impl<'a> DoubleEndedIterator for Iter<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(start, note)| (*start, note))
    }
}

impl<'a> IntoIterator for &'a Pattern {
    type Item = (Time, &'a Note);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (start, note)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", start, note)?;
        }
        write!(f, "] / {}", self.duration)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::Pattern;
    use crate::error::ValidationError;
    use crate::types::note::Note;
    use crate::types::time::Time;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct RawPattern {
        duration: Time,
        notes: Vec<(Time, Note)>,
    }

    impl Serialize for Pattern {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            RawPattern {
                duration: self.duration,
                notes: self.iter().map(|(start, note)| (start, *note)).collect(),
            }
            .serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for Pattern {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let raw = RawPattern::deserialize(deserializer)?;
            Pattern::from_notes(raw.notes, raw.duration)
                .map_err(|err: ValidationError| serde::de::Error::custom(err))
        }
    }
}
