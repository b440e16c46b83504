//! REPL (Read-Eval-Print Loop) for midiflow documents
//!
//! Line editing runs on its own thread; the main loop selects between typed
//! lines and file-watcher events, so a watched document reloads while the
//! prompt is waiting.

use crate::commands::{create_registry, CommandContext, CommandRegistry, CommandResult};
use crate::document::ConfigSpec;
use crate::repl::watcher::{changed_paths, FileWatcher};
use anyhow::Result;
use colored::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{info, warn};
use notify::Event;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RustylineResult};
use std::path::{Path, PathBuf};
use std::thread;

pub mod watcher;

/// Types of events the REPL loop handles
enum ReplEvent {
    Input(Result<String, ReadlineError>),
}

/// What the loop should do after handling a line
#[derive(Debug, PartialEq)]
enum Step {
    Continue,
    Exit,
}

/// Interactive shell over a [`CommandContext`]
pub struct Repl {
    editor: Option<DefaultEditor>,
    registry: CommandRegistry,
    ctx: CommandContext,

    // Event channels
    tx_input: Sender<ReplEvent>,
    rx_input: Receiver<ReplEvent>,
    tx_watcher: Sender<notify::Result<Event>>,
    rx_watcher: Receiver<notify::Result<Event>>,

    // File watcher, created on first `watch`
    watcher: Option<FileWatcher>,
    /// Print a fresh render after every successful reload
    render_on_reload: bool,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(ctx: CommandContext) -> RustylineResult<Self> {
        let editor = DefaultEditor::new()?;
        let (tx_input, rx_input) = unbounded();
        let (tx_watcher, rx_watcher) = unbounded();

        Ok(Repl {
            editor: Some(editor),
            registry: create_registry(),
            ctx,
            tx_input,
            rx_input,
            tx_watcher,
            rx_watcher,
            watcher: None,
            render_on_reload: false,
        })
    }

    pub fn set_render_on_reload(&mut self, enabled: bool) {
        self.render_on_reload = enabled;
    }

    /// Start the REPL loop
    pub fn run(&mut self) -> Result<()> {
        println!("{}", "Midiflow".bright_cyan().bold());
        println!(
            "Type '{}' for commands, '{}' or {} to exit.\n",
            "help".bright_green(),
            "quit".bright_red(),
            "Ctrl+C".bright_red()
        );

        // Move editor to thread
        let mut editor = self
            .editor
            .take()
            .ok_or_else(|| anyhow::anyhow!("REPL is already running"))?;
        let tx_input = self.tx_input.clone();

        thread::spawn(move || loop {
            let prompt = format!("{} ", "midiflow>".bright_magenta().bold());
            match editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if !line.is_empty() {
                        let _ = editor.add_history_entry(&line);
                    }
                    if tx_input.send(ReplEvent::Input(Ok(line))).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx_input.send(ReplEvent::Input(Err(err)));
                    break;
                }
            }
        });

        loop {
            crossbeam_channel::select! {
                recv(self.rx_input) -> msg => match msg {
                    Ok(ReplEvent::Input(Ok(line))) => {
                        if self.handle_line(&line) == Step::Exit {
                            println!("{}", "Goodbye!".bright_cyan());
                            break;
                        }
                    }
                    Ok(ReplEvent::Input(Err(ReadlineError::Interrupted)))
                    | Ok(ReplEvent::Input(Err(ReadlineError::Eof))) => {
                        println!("{}", "Goodbye!".bright_cyan());
                        break;
                    }
                    Ok(ReplEvent::Input(Err(err))) => {
                        println!(
                            "{} {}",
                            "Error reading input:".bright_red().bold(),
                            err.to_string().red()
                        );
                    }
                    Err(_) => break, // Channel closed
                },

                recv(self.rx_watcher) -> msg => match msg {
                    Ok(Ok(event)) => {
                        for path in changed_paths(&event) {
                            println!("{} File changed: {}", "⚡".bright_yellow(), path.display());
                            self.reload(path);
                        }
                    }
                    Ok(Err(e)) => {
                        warn!("watch error: {}", e);
                        println!("{} Watch error: {}", "Error:".red(), e);
                    }
                    Err(_) => break, // Channel closed
                }
            }
        }

        Ok(())
    }

    /// Run one typed line
    fn handle_line(&mut self, line: &str) -> Step {
        if line.is_empty() {
            return Step::Continue;
        }
        match self.registry.execute(line, &mut self.ctx) {
            CommandResult::Success => {}
            CommandResult::Message(msg) => println!("{}", msg),
            CommandResult::Exit => return Step::Exit,
            CommandResult::Error(e) => {
                println!("{} {}", "Error:".bright_red().bold(), e.red());
            }
            CommandResult::Watch(path) => self.watch(&path),
            CommandResult::NotACommand => {
                println!(
                    "{} unknown command {:?}, try '{}'",
                    "Error:".bright_red().bold(),
                    line,
                    "help".bright_green()
                );
            }
        }
        Step::Continue
    }

    /// Load `path` and keep reloading it whenever it changes.
    ///
    /// The shell holds one project, so a previously watched document is
    /// dropped from the watch list.
    pub fn watch(&mut self, path: &str) {
        if self.watcher.is_none() {
            match FileWatcher::new(self.tx_watcher.clone()) {
                Ok(w) => self.watcher = Some(w),
                Err(e) => {
                    println!("{} Failed to create watcher: {}", "Error:".red(), e);
                    return;
                }
            }
        }

        self.reload(Path::new(path));
        if let Some(w) = &mut self.watcher {
            let previous: Vec<PathBuf> = w
                .watched()
                .filter(|watched| *watched != Path::new(path))
                .map(Path::to_path_buf)
                .collect();
            for old in previous {
                if let Err(e) = w.unwatch(&old) {
                    warn!("failed to unwatch {}: {}", old.display(), e);
                }
            }
            if let Err(e) = w.watch(path) {
                println!("{} Failed to watch {}: {}", "Error:".red(), path, e);
            } else {
                println!("Watching {} for changes...", path.bright_green());
            }
        }
    }

    /// Load a document, keeping the previous one if it fails
    fn reload(&mut self, path: &Path) {
        match self.ctx.load(path) {
            Ok(project) => {
                info!("reloaded {}", path.display());
                println!(
                    "{} Reloaded {} node(s)",
                    "✓".bright_green(),
                    project.flow.len()
                );
                if self.render_on_reload {
                    self.handle_line("render");
                }
            }
            Err(e) => println!("{} {:#}", "Error:".red(), e),
        }
    }

    /// Documents under watch
    pub fn watched(&self) -> Vec<PathBuf> {
        self.watcher
            .as_ref()
            .map(|w| w.watched().map(Path::to_path_buf).collect())
            .unwrap_or_default()
    }
}

/// Convenience function to start the REPL, optionally with a document.
///
/// With `watch`, the document is reloaded and re-rendered on every change.
pub fn start(document: Option<&Path>, watch: bool, overrides: ConfigSpec) -> Result<()> {
    let mut ctx = CommandContext::new(overrides);
    // A watched document is loaded by the watcher itself
    if let Some(path) = document.filter(|_| !watch) {
        ctx.load(path)?;
    }
    let mut repl =
        Repl::new(ctx).map_err(|e| anyhow::anyhow!("Failed to initialize REPL: {}", e))?;
    if let (Some(path), true) = (document, watch) {
        repl.set_render_on_reload(true);
        repl.watch(&path.to_string_lossy());
    }
    repl.run()
}
