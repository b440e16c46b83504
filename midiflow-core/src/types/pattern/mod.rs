//! Pattern type: an immutable, ordered note container
//!
//! A pattern maps start times to notes and carries an explicit duration, so
//! trailing silence survives composition.

mod core;


pub use self::core::{Iter, Pattern};
