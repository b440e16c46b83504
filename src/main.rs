use anyhow::Result;
use clap::{Parser, Subcommand};
use midiflow::document::{ConfigSpec, Project};
use midiflow::render;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,

    /// Ticks per quarter note (overrides the document)
    #[clap(long, global = true)]
    ppq: Option<u16>,

    /// Microseconds per quarter note (overrides the document)
    #[clap(long, global = true)]
    tempo: Option<u32>,

    /// Render window start, as a rational like 3/4
    #[clap(long, global = true)]
    from: Option<String>,

    /// Render window end, as a rational like 8
    #[clap(long, global = true)]
    to: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a document's timeline to events
    Render {
        document: PathBuf,
        /// Print JSON instead of text
        #[clap(long)]
        json: bool,
        /// Print delta ticks instead of rational times
        #[clap(long)]
        ticks: bool,
        /// Open the shell and re-render whenever the document changes
        #[clap(long)]
        watch: bool,
    },
    /// Evaluate one node and print its pattern
    Eval { document: PathBuf, node: String },
    /// List a document's nodes
    Nodes { document: PathBuf },
    /// Start the interactive shell
    Repl { document: Option<PathBuf> },
}

impl Args {
    fn overrides(&self) -> ConfigSpec {
        ConfigSpec {
            tempo: self.tempo,
            ppq: self.ppq,
            start_time: self.from.clone(),
            end_time: self.to.clone(),
            default_programs: None,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let overrides = args.overrides();

    match &args.command {
        Command::Render {
            document,
            json,
            ticks,
            watch,
        } => {
            if *watch {
                return midiflow::repl::start(Some(document.as_path()), true, overrides);
            }
            let project = Project::load(document)?;
            let config = overrides.apply(project.config.clone())?;
            let output = match (*ticks, *json) {
                (true, true) => render::ticks_json(&project.render_ticks(&config)?)?,
                (true, false) => render::format_ticks(&project.render_ticks(&config)?),
                (false, true) => render::events_json(&project.render_with(&config)?, &config)?,
                (false, false) => render::format_events(&project.render_with(&config)?, &config),
            };
            print!("{}", output);
            if *json {
                println!();
            }
        }
        Command::Eval { document, node } => {
            let project = Project::load(document)?;
            print!("{}", render::format_pattern(&project.eval(node)?));
        }
        Command::Nodes { document } => {
            let project = Project::load(document)?;
            print!("{}", render::format_nodes(&project));
        }
        Command::Repl { document } => {
            midiflow::repl::start(document.as_deref(), false, overrides)?;
        }
    }
    Ok(())
}
