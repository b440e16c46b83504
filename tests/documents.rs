use midiflow::commands::{create_registry, CommandContext, CommandResult};
use midiflow::document::{ConfigSpec, Project};
use midiflow::render;
use midiflow_core::types::time::time;
use midiflow_core::MidiEvent;
use std::path::PathBuf;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

#[test]
fn test_demo_phrase_loads_and_renders() {
    let project = Project::load(demo("phrase.json")).unwrap();
    assert_eq!(project.flow.len(), 6);
    assert_eq!(project.path(), Some(demo("phrase.json").as_path()));

    let full = project.eval("full").unwrap();
    assert_eq!(full.len(), 44);

    let events = project.render().unwrap();
    let ons = events
        .iter()
        .filter(|e| matches!(e.event, MidiEvent::NoteOn { .. }))
        .count();
    assert_eq!(ons, 44);

    let json = render::events_json(&events, &project.config).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value.as_array().unwrap().len(), events.len());
}

#[test]
fn test_overrides_narrow_the_window() {
    let project = Project::load(demo("phrase.json")).unwrap();
    let overrides = ConfigSpec {
        start_time: Some("3/4".to_string()),
        end_time: Some("3/2".to_string()),
        ..ConfigSpec::default()
    };
    let config = overrides.apply(project.config.clone()).unwrap();
    let events = project.render_with(&config).unwrap();
    assert!(events
        .iter()
        .filter(|e| matches!(e.event, MidiEvent::NoteOn { .. }))
        .all(|e| e.time >= time(3, 4) && e.time < time(3, 2)));

    let bad = ConfigSpec {
        start_time: Some("2".to_string()),
        end_time: Some("1".to_string()),
        ..ConfigSpec::default()
    };
    assert!(bad.apply(project.config.clone()).is_err());
}

#[test]
fn test_shell_session() {
    colored::control::set_override(false);
    let registry = create_registry();
    let mut ctx = CommandContext::new(ConfigSpec::default());

    let load = format!("load {}", demo("phrase.json").display());
    assert!(matches!(registry.execute(&load, &mut ctx), CommandResult::Message(_)));
    assert!(matches!(
        registry.execute("eval phrase", &mut ctx),
        CommandResult::Message(_)
    ));
    match registry.execute("invalidate phrase", &mut ctx) {
        // phrase, backwards, mirrored, full; only phrase was cached
        CommandResult::Message(text) => assert_eq!(text, "Dropped 1 cached result(s)"),
        other => panic!("Expected Message, got {:?}", other),
    }
    assert_eq!(registry.execute("quit", &mut ctx), CommandResult::Exit);
}
