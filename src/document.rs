//! JSON flow documents
//!
//! A document names its nodes and refers to inputs by name, so nodes may be
//! listed in any order. Times are written as rational strings (`"3/8"`,
//! `"1"`) to keep them exact.
//!
//! ```json
//! {
//!   "config": { "tempo": 500000, "ppq": 480 },
//!   "nodes": [
//!     { "name": "a", "source": { "duration": "1/2",
//!       "notes": [["0", { "duration": "1/4", "pitch": 60, "velocity": 100 }]] } },
//!     { "name": "up", "modifier": { "kind": "transpose", "semitones": 12 }, "inputs": ["a"] }
//!   ],
//!   "timeline": [
//!     { "time": "0", "channel": 0, "node": "up" },
//!     { "time": "11/4", "channel": 0, "program": 40 }
//!   ]
//! }
//! ```

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use midiflow_core::types::time::parse_time;
use midiflow_core::{
    Modifier, NodeId, Note, OverlapPolicy, Pattern, PatternFlow, PlaybackConfig, TickEvent, Time,
    TimedEvent, Timeline,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// On-disk shape of a document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentFile {
    #[serde(default)]
    pub config: ConfigSpec,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub timeline: Vec<PlacementSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSpec {
    pub tempo: Option<u32>,
    pub ppq: Option<u16>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub default_programs: Option<BTreeMap<u8, u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<ModifierSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    /// Minimum length; grows to fit the notes
    #[serde(default = "zero_string")]
    pub duration: String,
    #[serde(default)]
    pub notes: Vec<(String, NoteSpec)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteSpec {
    pub duration: String,
    pub pitch: u8,
    #[serde(default = "default_velocity")]
    pub velocity: u8,
}

/// Modifier as written in a document, with times as strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModifierSpec {
    Transpose { semitones: i8 },
    Invert { center: u8 },
    Reverse,
    Quantize { grid: String },
    Stretch { factor: String },
    Shift { delta: String },
    Slice { from: String, to: Option<String> },
    ScaleVelocity { factor: String },
    SetVelocity { velocity: u8 },
    ScaleDuration { factor: String },
    SetDuration { duration: String },
    Concatenate,
    Merge {
        #[serde(default)]
        policy: OverlapPolicy,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlacementSpec {
    pub time: String,
    pub channel: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<u8>,
}

fn zero_string() -> String {
    "0".to_string()
}

fn default_velocity() -> u8 {
    Note::default().velocity()
}

fn time_field(value: &str, what: &str) -> Result<Time> {
    parse_time(value).ok_or_else(|| anyhow!("invalid time {:?} for {}", value, what))
}

impl ModifierSpec {
    pub fn to_modifier(&self) -> Result<Modifier> {
        let modifier = match self {
            ModifierSpec::Transpose { semitones } => Modifier::transpose(*semitones),
            ModifierSpec::Invert { center } => Modifier::invert(*center)?,
            ModifierSpec::Reverse => Modifier::Reverse,
            ModifierSpec::Quantize { grid } => Modifier::quantize(time_field(grid, "grid")?)?,
            ModifierSpec::Stretch { factor } => Modifier::stretch(time_field(factor, "factor")?)?,
            ModifierSpec::Shift { delta } => Modifier::shift(time_field(delta, "delta")?),
            ModifierSpec::Slice { from, to } => {
                let to = to.as_deref().map(|to| time_field(to, "to")).transpose()?;
                Modifier::slice(time_field(from, "from")?, to)?
            }
            ModifierSpec::ScaleVelocity { factor } => {
                Modifier::scale_velocity(time_field(factor, "factor")?)?
            }
            ModifierSpec::SetVelocity { velocity } => Modifier::set_velocity(*velocity)?,
            ModifierSpec::ScaleDuration { factor } => {
                Modifier::scale_duration(time_field(factor, "factor")?)?
            }
            ModifierSpec::SetDuration { duration } => {
                Modifier::set_duration(time_field(duration, "duration")?)?
            }
            ModifierSpec::Concatenate => Modifier::Concatenate,
            ModifierSpec::Merge { policy } => Modifier::merge(*policy),
        };
        Ok(modifier)
    }
}

impl SourceSpec {
    pub fn to_pattern(&self) -> Result<Pattern> {
        let duration = time_field(&self.duration, "source duration")?;
        let notes = self
            .notes
            .iter()
            .map(|(start, note)| {
                let start = time_field(start, "note start")?;
                let duration = time_field(&note.duration, "note duration")?;
                Ok((start, Note::new(duration, note.pitch, note.velocity)?))
            })
            .collect::<Result<Vec<(Time, Note)>>>()?;
        Ok(Pattern::from_notes(notes, duration)?)
    }
}

impl ConfigSpec {
    /// Apply the fields present in the document on top of `base`
    pub fn apply(&self, base: PlaybackConfig) -> Result<PlaybackConfig> {
        let mut config = base;
        if let Some(tempo) = self.tempo {
            config.tempo = tempo;
        }
        if let Some(ppq) = self.ppq {
            config.ppq = ppq;
        }
        if let Some(start) = &self.start_time {
            config.start_time = time_field(start, "start_time")?;
        }
        if let Some(end) = &self.end_time {
            config.end_time = Some(time_field(end, "end_time")?);
        }
        if let Some(programs) = &self.default_programs {
            config.default_programs.extend(programs);
        }
        config.validate()?;
        Ok(config)
    }
}

/// A loaded document: the flow, its node names, the timeline and the config
#[derive(Debug, Clone)]
pub struct Project {
    pub flow: PatternFlow,
    pub timeline: Timeline,
    pub config: PlaybackConfig,
    names: BTreeMap<String, NodeId>,
    path: Option<PathBuf>,
}

impl Project {
    /// Read and build a document from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut project =
            Self::from_json(&text).with_context(|| format!("failed to load {}", path.display()))?;
        project.path = Some(path.to_path_buf());
        info!(
            "loaded {}: {} node(s), {} placement(s)",
            path.display(),
            project.flow.len(),
            project.timeline.len()
        );
        Ok(project)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: DocumentFile = serde_json::from_str(text).context("malformed document")?;
        Self::from_document(&file)
    }

    pub fn from_document(file: &DocumentFile) -> Result<Self> {
        let config = file.config.apply(PlaybackConfig::default())?;

        let mut specs: HashMap<&str, &NodeSpec> = HashMap::new();
        for node in &file.nodes {
            if specs.insert(node.name.as_str(), node).is_some() {
                bail!("duplicate node name {:?}", node.name);
            }
        }

        let mut builder = Builder {
            specs: &specs,
            flow: PatternFlow::new(),
            names: BTreeMap::new(),
            visiting: Vec::new(),
        };
        for node in &file.nodes {
            builder.build(&node.name)?;
        }

        let mut timeline = Timeline::new();
        for (index, placement) in file.timeline.iter().enumerate() {
            let time = time_field(&placement.time, "placement time")?;
            match (&placement.node, placement.program) {
                (Some(name), None) => {
                    let id = *builder
                        .names
                        .get(name)
                        .ok_or_else(|| anyhow!("timeline entry {} places unknown node {:?}", index, name))?;
                    timeline.place_node(time, placement.channel, id)?;
                }
                (None, Some(program)) => timeline.place_program(time, placement.channel, program)?,
                _ => bail!(
                    "timeline entry {} needs exactly one of \"node\" or \"program\"",
                    index
                ),
            }
        }

        Ok(Project {
            flow: builder.flow,
            timeline,
            config,
            names: builder.names,
            path: None,
        })
    }

    /// File this project was loaded from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn node_id(&self, name: &str) -> Result<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("no node named {:?}", name))
    }

    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.names
            .iter()
            .find(|(_, node)| **node == id)
            .map(|(name, _)| name.as_str())
    }

    /// Node names in flow order
    pub fn names(&self) -> Vec<(&str, NodeId)> {
        let mut names: Vec<(&str, NodeId)> =
            self.names.iter().map(|(name, id)| (name.as_str(), *id)).collect();
        names.sort_by_key(|(_, id)| *id);
        names
    }

    pub fn eval(&self, name: &str) -> Result<Pattern> {
        let id = self.node_id(name)?;
        self.flow
            .evaluate(id)
            .with_context(|| format!("failed to evaluate {:?}", name))
    }

    pub fn invalidate(&mut self, name: &str) -> Result<usize> {
        let id = self.node_id(name)?;
        Ok(self.flow.invalidate(id)?)
    }

    pub fn render(&self) -> Result<Vec<TimedEvent>> {
        self.render_with(&self.config)
    }

    /// Render with a config other than the document's own
    pub fn render_with(&self, config: &PlaybackConfig) -> Result<Vec<TimedEvent>> {
        self.timeline
            .render(&self.flow, config)
            .map_err(|err| self.describe(err))
    }

    pub fn render_ticks(&self, config: &PlaybackConfig) -> Result<Vec<TickEvent>> {
        self.timeline
            .render_ticks(&self.flow, config)
            .map_err(|err| self.describe(err))
    }

    /// Name the failing node in an evaluation error
    fn describe(&self, err: midiflow_core::ValidationError) -> anyhow::Error {
        let node = match &err {
            midiflow_core::ValidationError::Evaluation { node, .. } => self.name_of(*node),
            _ => None,
        };
        match node {
            Some(name) => anyhow::Error::new(err).context(format!("node {:?} failed", name)),
            None => anyhow::Error::new(err),
        }
    }
}

/// Adds named nodes to a flow inputs-first, following names depth first
struct Builder<'a> {
    specs: &'a HashMap<&'a str, &'a NodeSpec>,
    flow: PatternFlow,
    names: BTreeMap<String, NodeId>,
    /// Names on the current path, for cycle reports
    visiting: Vec<String>,
}

impl Builder<'_> {
    fn build(&mut self, name: &str) -> Result<NodeId> {
        if let Some(id) = self.names.get(name) {
            return Ok(*id);
        }
        if let Some(pos) = self.visiting.iter().position(|n| n == name) {
            let mut path = self.visiting[pos..].to_vec();
            path.push(name.to_string());
            bail!("cycle between nodes: {}", path.join(" -> "));
        }
        let specs = self.specs;
        let spec = *specs
            .get(name)
            .ok_or_else(|| anyhow!("unknown node {:?}", name))?;

        let id = match (&spec.source, &spec.modifier) {
            (Some(source), None) => {
                if !spec.inputs.is_empty() {
                    bail!("source node {:?} cannot have inputs", name);
                }
                let pattern = source
                    .to_pattern()
                    .with_context(|| format!("invalid source {:?}", name))?;
                self.flow.add_source(pattern)
            }
            (None, Some(modifier)) => {
                let modifier = modifier
                    .to_modifier()
                    .with_context(|| format!("invalid modifier on {:?}", name))?;
                self.visiting.push(name.to_string());
                let inputs = spec
                    .inputs
                    .iter()
                    .map(|input| {
                        self.build(input)
                            .with_context(|| format!("while resolving inputs of {:?}", name))
                    })
                    .collect::<Result<Vec<NodeId>>>();
                self.visiting.pop();
                self.flow
                    .add_transform(modifier, &inputs?)
                    .with_context(|| format!("invalid node {:?}", name))?
            }
            _ => bail!("node {:?} needs exactly one of \"source\" or \"modifier\"", name),
        };
        self.names.insert(name.to_string(), id);
        Ok(id)
    }
}
