use std::sync::{Arc, Mutex};

use crate::stage_manager::registry::ListenerRegistry;
use crate::stage_manager::{Action, Stage};

fn recording_action(stage: Stage, label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Action {
    let log = Arc::clone(log);
    Action::from_fn(stage, label, move |stage: &Stage| {
        log.lock().unwrap().push(format!("{}:{}", stage, label));
        Ok(())
    })
}

#[test]
fn test_registry_initialization() {
    let registry = ListenerRegistry::new();

    assert_eq!(registry.total(), 0, "New registry should be empty");
    assert!(registry.actions_for(&Stage::START).is_empty());
    assert!(registry.stages_with_actions().is_empty());
}

#[test]
fn test_actions_keep_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ListenerRegistry::new();

    registry.register(recording_action(Stage::START, "first", &log));
    registry.register(recording_action(Stage::STOP, "other", &log));
    registry.register(recording_action(Stage::START, "second", &log));
    registry.register(recording_action(Stage::START, "third", &log));

    let labels: Vec<&str> = registry.actions_for(&Stage::START).iter().map(Action::label).collect();
    assert_eq!(labels, vec!["first", "second", "third"]);
    assert_eq!(registry.count(&Stage::START), 3);
    assert_eq!(registry.count(&Stage::STOP), 1);
    assert_eq!(registry.total(), 4);
}

#[test]
fn test_actions_for_does_not_invoke_or_mutate() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ListenerRegistry::new();
    registry.register(recording_action(Stage::START, "only", &log));

    let _ = registry.actions_for(&Stage::START);
    let _ = registry.actions_for(&Stage::START);

    assert!(log.lock().unwrap().is_empty(), "Looking up actions must not run them");
    assert_eq!(registry.count(&Stage::START), 1);
}

#[test]
fn test_action_at_indexes_within_stage() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ListenerRegistry::new();
    registry.register(recording_action(Stage::CONFIGURE, "a", &log));
    registry.register(recording_action(Stage::CONFIGURE, "b", &log));

    assert_eq!(registry.action_at(&Stage::CONFIGURE, 1).map(Action::label), Some("b"));
    assert!(registry.action_at(&Stage::CONFIGURE, 2).is_none());
    assert!(registry.action_at(&Stage::STOP, 0).is_none());
}

#[test]
fn test_invoke_passes_bound_stage() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let action = recording_action(Stage::STOP, "shutdown", &log);

    action.invoke().expect("action should succeed");

    assert_eq!(*log.lock().unwrap(), vec!["stop:shutdown".to_string()]);
}
