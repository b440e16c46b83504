// midiflow-core/src/types/mod.rs

pub mod note;
pub mod pattern;
pub mod time;

pub use note::Note;
pub use pattern::Pattern;
pub use time::{Time, TimeSpan};
