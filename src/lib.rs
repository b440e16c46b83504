//! # Midiflow
//!
//! Front end for the midiflow core: loads JSON flow documents, evaluates
//! nodes, renders timelines to MIDI-ready events and offers an interactive
//! shell that reloads documents as they change.
//!
//! ## Modules
//!
//! - `document`: JSON documents with named nodes, loaded into a [`Project`].
//! - `commands`: the command registry shared by the shell.
//! - `repl`: line-edited shell with a file watcher.
//! - `render`: colored text and JSON output.

pub mod commands;
pub mod document;
pub mod render;
pub mod repl;

pub use crate::document::{ConfigSpec, Project};
