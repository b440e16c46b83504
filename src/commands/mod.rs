//! Command registry for REPL commands
//!
//! Provides a clean, extensible pattern for handling REPL commands.

pub mod flow;
pub mod general;

use crate::document::{ConfigSpec, Project};
use anyhow::{anyhow, Result};
use midiflow_core::PlaybackConfig;
use std::path::Path;

/// Result of executing a command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Command executed successfully, continue REPL
    Success,
    /// Command executed, show this message
    Message(String),
    /// Exit the REPL
    Exit,
    /// Not a command
    NotACommand,
    /// Error occurred
    Error(String),
    /// Watch a file for changes
    Watch(String),
}

/// State shared by command handlers: the loaded project and the settings
/// given on the command line, which win over the document's own
pub struct CommandContext {
    pub project: Option<Project>,
    pub overrides: ConfigSpec,
}

impl CommandContext {
    pub fn new(overrides: ConfigSpec) -> Self {
        Self {
            project: None,
            overrides,
        }
    }

    pub fn with_project(project: Project, overrides: ConfigSpec) -> Self {
        Self {
            project: Some(project),
            overrides,
        }
    }

    /// Load (or reload) a document, replacing the current project
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<&Project> {
        let project = Project::load(path)?;
        Ok(&*self.project.insert(project))
    }

    pub fn project(&self) -> Result<&Project> {
        self.project
            .as_ref()
            .ok_or_else(|| anyhow!("no document loaded (use: load <file>)"))
    }

    pub fn project_mut(&mut self) -> Result<&mut Project> {
        self.project
            .as_mut()
            .ok_or_else(|| anyhow!("no document loaded (use: load <file>)"))
    }

    /// The document's config with command-line overrides applied
    pub fn config(&self) -> Result<PlaybackConfig> {
        let base = self
            .project
            .as_ref()
            .map(|project| project.config.clone())
            .unwrap_or_default();
        self.overrides.apply(base)
    }
}

/// A command handler function
pub type CommandHandler = fn(&str, &mut CommandContext) -> CommandResult;

/// Registry of available commands
pub struct CommandRegistry {
    /// Commands indexed by their prefix, longest first so the most specific
    /// prefix wins
    commands: Vec<(String, CommandHandler)>,
}

impl CommandRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Register a command with its prefix
    pub fn register(&mut self, prefix: &str, handler: CommandHandler) {
        self.commands.push((prefix.to_string(), handler));
        self.commands.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Execute a command, returning NotACommand if no match found
    pub fn execute(&self, input: &str, ctx: &mut CommandContext) -> CommandResult {
        for (prefix, handler) in &self.commands {
            if input == prefix || input.starts_with(&format!("{} ", prefix)) {
                let args = input[prefix.len()..].trim();
                return handler(args, ctx);
            }
        }
        CommandResult::NotACommand
    }

    /// Get all registered command prefixes
    pub fn list_commands(&self) -> Vec<&str> {
        self.commands.iter().map(|(p, _)| p.as_str()).collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a fully populated command registry with all built-in commands
pub fn create_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    // Document and flow commands
    registry.register("load", flow::cmd_load);
    registry.register("nodes", flow::cmd_nodes);
    registry.register("eval", flow::cmd_eval);
    registry.register("render", flow::cmd_render);
    registry.register("ticks", flow::cmd_ticks);
    registry.register("invalidate", flow::cmd_invalidate);

    // General commands
    registry.register("tempo", general::cmd_tempo);
    registry.register("help", general::cmd_help);
    registry.register("quit", general::cmd_quit);
    registry.register("exit", general::cmd_quit);
    registry.register("watch", general::cmd_watch);

    registry
}

/// Turn a fallible handler body into a command result
pub(crate) fn reply(result: Result<String>) -> CommandResult {
    match result {
        Ok(message) => CommandResult::Message(message),
        Err(err) => CommandResult::Error(format!("{:#}", err)),
    }
}
