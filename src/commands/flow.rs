//! Document and flow commands (load, nodes, eval, render, ticks, invalidate)

use crate::commands::{reply, CommandContext, CommandResult};
use crate::render;
use anyhow::{bail, Result};
use colored::*;

/// Handle `load <file>` command
pub fn cmd_load(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: load <file>".to_string());
    }
    reply(ctx.load(args).map(|project| {
        format!(
            "{} Loaded {} node(s), {} placement(s)",
            "✓".bright_green(),
            project.flow.len(),
            project.timeline.len()
        )
    }))
}

/// Handle `nodes` command
pub fn cmd_nodes(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    reply(ctx.project().map(|project| {
        let listing = render::format_nodes(project);
        listing.trim_end().to_string()
    }))
}

/// Handle `eval <name>` command
pub fn cmd_eval(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: eval <name>".to_string());
    }
    reply(
        ctx.project()
            .and_then(|project| project.eval(args))
            .map(|pattern| render::format_pattern(&pattern).trim_end().to_string()),
    )
}

/// Handle `render [json]` command
pub fn cmd_render(args: &str, ctx: &mut CommandContext) -> CommandResult {
    reply(render_events(args, ctx))
}

fn render_events(args: &str, ctx: &CommandContext) -> Result<String> {
    let json = json_flag(args)?;
    let config = ctx.config()?;
    let events = ctx.project()?.render_with(&config)?;
    if json {
        render::events_json(&events, &config)
    } else {
        Ok(render::format_events(&events, &config).trim_end().to_string())
    }
}

/// Handle `ticks [json]` command
pub fn cmd_ticks(args: &str, ctx: &mut CommandContext) -> CommandResult {
    reply(render_ticks(args, ctx))
}

fn render_ticks(args: &str, ctx: &CommandContext) -> Result<String> {
    let json = json_flag(args)?;
    let config = ctx.config()?;
    let ticks = ctx.project()?.render_ticks(&config)?;
    if json {
        render::ticks_json(&ticks)
    } else {
        Ok(render::format_ticks(&ticks).trim_end().to_string())
    }
}

/// Handle `invalidate <name>` command
pub fn cmd_invalidate(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: invalidate <name>".to_string());
    }
    reply(
        ctx.project_mut()
            .and_then(|project| project.invalidate(args))
            .map(|dropped| format!("Dropped {} cached result(s)", dropped)),
    )
}

fn json_flag(args: &str) -> Result<bool> {
    match args {
        "" => Ok(false),
        "json" => Ok(true),
        other => bail!("unexpected argument {:?} (expected nothing or 'json')", other),
    }
}
