//! General REPL commands (help, quit, tempo, watch)

use crate::commands::{CommandContext, CommandResult};
use colored::*;

/// Handle `help` command
pub fn cmd_help(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    print_help();
    CommandResult::Success
}

/// Handle `quit` or `exit` command
pub fn cmd_quit(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    CommandResult::Exit
}

/// Handle `tempo [microseconds per quarter]` command
pub fn cmd_tempo(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return match ctx.config() {
            Ok(config) => CommandResult::Message(format!(
                "Current tempo: {} µs per quarter ({:.1} BPM)",
                config.tempo,
                config.bpm()
            )),
            Err(e) => CommandResult::Error(format!("{:#}", e)),
        };
    }

    match args.parse::<u32>() {
        Ok(tempo) if tempo > 0 => {
            ctx.overrides.tempo = Some(tempo);
            CommandResult::Message(
                format!(
                    "Tempo set to {} µs per quarter ({:.1} BPM)",
                    tempo,
                    60_000_000.0 / tempo as f64
                )
                .bright_green()
                .to_string(),
            )
        }
        _ => CommandResult::Error(
            "Invalid tempo. Use a positive number of microseconds per quarter note".to_string(),
        ),
    }
}

/// Handle `watch [file]` command
pub fn cmd_watch(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: watch <file>".to_string());
    }
    CommandResult::Watch(args.to_string())
}

/// Print help information
fn print_help() {
    println!("{}", "Midiflow Help".bold());
    println!("{}", "=============".bold());
    println!();
    println!("{}", "Documents:".green());
    println!("  {}     - Load a JSON flow document", "load <file>".cyan());
    println!("  {}    - Reload a document whenever it changes", "watch <file>".cyan());
    println!();
    println!("{}", "Flow:".green());
    println!("  {}           - List nodes and their inputs", "nodes".cyan());
    println!("  {}     - Evaluate a node and print its pattern", "eval <name>".cyan());
    println!("  {} - Drop cached results of a node and its dependents", "invalidate <name>".cyan());
    println!();
    println!("{}", "Output:".green());
    println!("  {}   - Render the timeline to events (add 'json' for JSON)", "render [json]".cyan());
    println!("  {}    - Render to delta ticks (add 'json' for JSON)", "ticks [json]".cyan());
    println!("  {}      - Show or set tempo in µs per quarter note", "tempo [µs]".cyan());
    println!();
    println!("{}", "General:".green());
    println!("  {}            - Show this help", "help".cyan());
    println!("  {}     - Leave", "quit, exit".cyan());
}
