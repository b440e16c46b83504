//! # Midiflow Core
//!
//! Pure library for building symbolic MIDI material: time-indexed note
//! patterns, pure modifiers over them, and a cached dependency graph that
//! wires the two together. No I/O happens here.
//!
//! ## Features
//!
//! - **serde**: Enable serialization of patterns, modifiers and rendered events
//!
//! ## Example
//!
//! ```
//! use midiflow_core::{Modifier, Note, Pattern, PatternFlow};
//! use midiflow_core::types::time::{time, ZERO};
//!
//! let quarter = Note::new(time(1, 4), 60, 100)?;
//! let riff = Pattern::from_notes(vec![(ZERO, quarter)], time(1, 2))?;
//!
//! let mut flow = PatternFlow::new();
//! let a = flow.add_source(riff.clone());
//! let b = flow.add_source(riff);
//! let both = flow.add_transform(Modifier::Concatenate, &[a, b])?;
//! assert_eq!(flow.evaluate(both)?.duration(), time(1, 1));
//! # Ok::<(), midiflow_core::ValidationError>(())
//! ```

pub mod error;
pub mod flow;
pub mod modifier;
pub mod timeline;
pub mod types;

// Re-export commonly used types
pub use error::{Result, ValidationError};
pub use flow::{NodeId, NodeKind, PatternFlow, PatternFlowNode};
pub use modifier::{Arity, CustomModifier, Modifier, OverlapPolicy};
pub use timeline::{MidiEvent, PlaybackConfig, ProgramChange, TickEvent, TimedEvent, Timeline};
pub use types::{Note, Pattern, Time, TimeSpan};
