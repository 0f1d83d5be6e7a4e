use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::kernel::error::Error;
use crate::kernel::lifecycle::{BindOutcome, Lifecycle};
use crate::stage_manager::error::StageSystemError;
use crate::stage_manager::{Action, ActionError, CatchUpPolicy, Listener, Stage, StageSet};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn record(lifecycle: &Lifecycle, stage: Stage, label: &'static str, log: &Log) -> BindOutcome {
    let log = Arc::clone(log);
    lifecycle
        .add_listener(stage, move |stage: &Stage| {
            log.lock().unwrap().push(format!("{}:{}", stage, label));
            Ok(())
        })
        .expect("listener registration should succeed")
}

#[test]
fn test_new_lifecycle_is_not_started() {
    let lifecycle = Lifecycle::standard();

    assert_eq!(lifecycle.current_stage(), None);
    assert_eq!(lifecycle.next_stage(), Some(Stage::CONFIGURE));
    assert!(!lifecycle.is_started());
    assert!(!lifecycle.is_terminal());
}

#[test]
fn test_execute_to_walks_every_intervening_stage_in_order() {
    let lifecycle = Lifecycle::standard();
    let log = new_log();

    // Registered in reverse stage order to show stage order wins
    record(&lifecycle, Stage::STOP, "stop", &log);
    record(&lifecycle, Stage::START, "start-a", &log);
    record(&lifecycle, Stage::CONFIGURE, "configure", &log);
    record(&lifecycle, Stage::START, "start-b", &log);

    lifecycle.execute_to(&Stage::START).expect("execute_to should succeed");

    assert_eq!(
        entries(&log),
        vec!["configure:configure", "start:start-a", "start:start-b"]
    );
    assert_eq!(lifecycle.current_stage(), Some(Stage::START));
    assert_eq!(lifecycle.next_stage(), Some(Stage::STOP));
}

#[test]
fn test_execute_to_same_or_earlier_stage_is_noop() {
    let lifecycle = Lifecycle::standard();
    let log = new_log();
    record(&lifecycle, Stage::CONFIGURE, "configure", &log);
    record(&lifecycle, Stage::START, "start", &log);

    lifecycle.execute_to(&Stage::START).unwrap();
    lifecycle.execute_to(&Stage::START).unwrap();
    lifecycle.execute_to(&Stage::CONFIGURE).unwrap();

    assert_eq!(entries(&log), vec!["configure:configure", "start:start"]);
    assert_eq!(lifecycle.current_stage(), Some(Stage::START));
}

#[test]
fn test_start_then_stop_scenario() {
    // Stage set [CONFIGURE, START, STOP]; object with START and STOP actions
    let lifecycle = Lifecycle::standard();
    let started = Arc::new(AtomicUsize::new(0));
    let stopped = Arc::new(AtomicUsize::new(0));

    let s = Arc::clone(&started);
    lifecycle
        .add_listener(Stage::START, move |_: &Stage| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    let s = Arc::clone(&stopped);
    lifecycle
        .add_listener(Stage::STOP, move |_: &Stage| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    lifecycle.execute_to(&Stage::START).unwrap();
    assert_eq!(started.load(Ordering::SeqCst), 1);
    assert_eq!(stopped.load(Ordering::SeqCst), 0);

    lifecycle.execute_to(&Stage::STOP).unwrap();
    assert_eq!(started.load(Ordering::SeqCst), 1, "START must not re-fire");
    assert_eq!(stopped.load(Ordering::SeqCst), 1);

    lifecycle.execute_to(&Stage::START).unwrap();
    assert_eq!(started.load(Ordering::SeqCst), 1);
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
    assert!(lifecycle.is_terminal());
}

#[test]
fn test_terminal_lifecycle_ignores_every_target() {
    let lifecycle = Lifecycle::standard();
    let log = new_log();
    record(&lifecycle, Stage::STOP, "stop", &log);

    lifecycle.execute_to(&Stage::STOP).unwrap();
    for stage in [Stage::CONFIGURE, Stage::START, Stage::STOP] {
        lifecycle.execute_to(&stage).unwrap();
    }

    assert_eq!(entries(&log), vec!["stop:stop"]);
    assert_eq!(lifecycle.next_stage(), None);
    assert_eq!(lifecycle.execute_next().unwrap(), None);
}

#[test]
fn test_execute_next_advances_one_stage_at_a_time() {
    let lifecycle = Lifecycle::new(StageSet::service_discovery());
    let mut reached = Vec::new();
    while let Some(stage) = lifecycle.execute_next().unwrap() {
        reached.push(stage);
    }

    let expected: Vec<Stage> = StageSet::service_discovery().iter().cloned().collect();
    assert_eq!(reached, expected);
    assert!(lifecycle.is_terminal());
}

#[test]
fn test_unknown_target_is_rejected() {
    let lifecycle = Lifecycle::standard();
    let target = Stage::new("announce-elsewhere");

    match lifecycle.execute_to(&target) {
        Err(Error::StageSystem(StageSystemError::UnknownStage { stage })) => assert_eq!(stage, target),
        other => panic!("Expected UnknownStage, got {:?}", other),
    }
    assert_eq!(lifecycle.current_stage(), None);
}

#[test]
fn test_listener_for_unknown_stage_is_rejected() {
    let lifecycle = Lifecycle::standard();
    let result = lifecycle.add_listener(Stage::ANNOUNCE, |_: &Stage| Ok(()));

    assert!(matches!(
        result,
        Err(Error::StageSystem(StageSystemError::UnknownStage { .. }))
    ));
    assert_eq!(lifecycle.registered_actions(&Stage::ANNOUNCE), 0);
}

#[test]
fn test_action_failure_stops_walk_at_last_completed_stage() {
    let lifecycle = Lifecycle::standard();
    let log = new_log();
    record(&lifecycle, Stage::CONFIGURE, "configure", &log);
    record(&lifecycle, Stage::START, "before", &log);
    lifecycle
        .add_listener(Stage::START, |_: &Stage| Err("port already bound".into()))
        .unwrap();
    record(&lifecycle, Stage::START, "after", &log);
    record(&lifecycle, Stage::STOP, "stop", &log);

    let err = lifecycle.execute_to(&Stage::STOP).unwrap_err();

    match &err {
        Error::ActionFailed { stage, action, source } => {
            assert_eq!(stage, &Stage::START);
            assert_eq!(action, "listener");
            assert_eq!(source.to_string(), "port already bound");
        }
        other => panic!("Expected ActionFailed, got {:?}", other),
    }
    assert_eq!(lifecycle.current_stage(), Some(Stage::CONFIGURE), "START did not complete");
    assert_eq!(entries(&log), vec!["configure:configure", "start:before"]);
}

#[test]
fn test_retry_after_failure_does_not_rerun_invoked_actions() {
    let lifecycle = Lifecycle::standard();
    let log = new_log();
    let attempts = Arc::new(AtomicUsize::new(0));

    record(&lifecycle, Stage::START, "before", &log);
    let a = Arc::clone(&attempts);
    lifecycle
        .add_listener(Stage::START, move |_: &Stage| {
            a.fetch_add(1, Ordering::SeqCst);
            Err("flaky".into())
        })
        .unwrap();
    record(&lifecycle, Stage::START, "after", &log);

    assert!(lifecycle.execute_to(&Stage::START).is_err());
    lifecycle.execute_to(&Stage::START).expect("second attempt resumes after the failed action");

    assert_eq!(attempts.load(Ordering::SeqCst), 1, "Failed action runs at most once");
    assert_eq!(entries(&log), vec!["start:before", "start:after"]);
    assert_eq!(lifecycle.current_stage(), Some(Stage::START));
}

#[test]
fn test_late_listener_on_first_stage_is_caught_up() {
    let lifecycle = Lifecycle::standard();
    lifecycle.execute_to(&Stage::START).unwrap();

    let log = new_log();
    let outcome = record(&lifecycle, Stage::CONFIGURE, "late", &log);

    assert_eq!(outcome, BindOutcome { registered: 0, caught_up: 1 });
    assert_eq!(entries(&log), vec!["configure:late"], "Catch-up runs during registration");

    lifecycle.execute_to(&Stage::STOP).unwrap();
    assert_eq!(entries(&log), vec!["configure:late"], "Caught-up action never runs again");
}

#[test]
fn test_late_listener_on_passed_stage_is_refused() {
    let lifecycle = Lifecycle::standard();
    lifecycle.execute_to(&Stage::START).unwrap();

    let result = lifecycle.add_listener(Stage::START, |_: &Stage| Ok(()));

    match result {
        Err(Error::LateBinding { stage, type_name, method }) => {
            assert_eq!(stage, Stage::START);
            assert_eq!(type_name, "listener");
            assert_eq!(method, "listener");
        }
        other => panic!("Expected LateBinding, got {:?}", other),
    }
    assert_eq!(lifecycle.registered_actions(&Stage::START), 0);
}

#[test]
fn test_policy_always_catches_up_every_passed_stage() {
    let lifecycle = Lifecycle::builder()
        .catch_up(CatchUpPolicy::Always)
        .build()
        .unwrap();
    lifecycle.execute_to(&Stage::STOP).unwrap();

    let log = new_log();
    let outcome = record(&lifecycle, Stage::START, "late-start", &log);

    assert_eq!(outcome.caught_up, 1);
    assert_eq!(entries(&log), vec!["start:late-start"]);
}

#[test]
fn test_policy_never_refuses_even_the_first_stage() {
    let lifecycle = Lifecycle::builder().catch_up(CatchUpPolicy::Never).build().unwrap();
    lifecycle.execute_to(&Stage::CONFIGURE).unwrap();

    let result = lifecycle.add_listener(Stage::CONFIGURE, |_: &Stage| Ok(()));
    assert!(result.unwrap_err().is_late_binding());
}

#[test]
fn test_builder_rejects_policy_naming_unknown_stage() {
    let result = Lifecycle::builder()
        .stages(StageSet::standard())
        .catch_up(CatchUpPolicy::Only(vec![Stage::ANNOUNCE]))
        .build();

    assert!(matches!(
        result,
        Err(Error::StageSystem(StageSystemError::UnknownCatchUpStage { .. }))
    ));
}

#[test]
fn test_attach_is_all_or_nothing() {
    let lifecycle = Lifecycle::standard();
    lifecycle.execute_to(&Stage::START).unwrap();
    let log = new_log();

    let make = |stage: Stage, label: &'static str| {
        let log = Arc::clone(&log);
        Action::from_fn(stage, label, move |stage: &Stage| {
            log.lock().unwrap().push(format!("{}:{}", stage, label));
            Ok(())
        })
    };

    // configure is eligible, start is not: nothing may happen
    let result = lifecycle.attach(
        "Widget",
        vec![
            make(Stage::CONFIGURE, "configure"),
            make(Stage::START, "start"),
            make(Stage::STOP, "stop"),
        ],
    );

    assert!(result.unwrap_err().is_late_binding());
    assert!(entries(&log).is_empty(), "No catch-up may run when binding fails");
    assert_eq!(lifecycle.registered_actions(&Stage::STOP), 0, "No future action may be registered");
}

#[test]
fn test_failed_catch_up_registers_nothing() {
    let lifecycle = Lifecycle::standard();
    lifecycle.execute_to(&Stage::CONFIGURE).unwrap();

    let actions = vec![
        Action::from_fn(Stage::CONFIGURE, "configure", |_: &Stage| -> Result<(), ActionError> {
            Err("bad config".into())
        }),
        Action::from_fn(Stage::STOP, "stop", |_: &Stage| Ok(())),
    ];
    let result = lifecycle.attach("Widget", actions);

    assert!(matches!(result, Err(Error::ActionFailed { .. })));
    assert_eq!(lifecycle.registered_actions(&Stage::STOP), 0);
}

#[test]
fn test_listener_added_during_dispatch_of_same_stage_runs_in_that_dispatch() {
    let lifecycle = Arc::new(Lifecycle::standard());
    let log = new_log();

    let inner_lifecycle = Arc::clone(&lifecycle);
    let inner_log = Arc::clone(&log);
    lifecycle
        .add_listener(Stage::START, move |_: &Stage| {
            inner_log.lock().unwrap().push("start:outer".to_string());
            let nested_log = Arc::clone(&inner_log);
            inner_lifecycle.add_listener(Stage::START, move |_: &Stage| {
                nested_log.lock().unwrap().push("start:nested".to_string());
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

    lifecycle.execute_to(&Stage::START).unwrap();

    assert_eq!(entries(&log), vec!["start:outer", "start:nested"]);
    assert_eq!(lifecycle.current_stage(), Some(Stage::START));
}

#[test]
fn test_execute_to_from_inside_an_action_is_rejected() {
    let lifecycle = Arc::new(Lifecycle::standard());
    let inner = Arc::clone(&lifecycle);
    let observed = Arc::new(Mutex::new(None));
    let observed_inner = Arc::clone(&observed);

    lifecycle
        .add_listener(Stage::START, move |_: &Stage| {
            let result = inner.execute_to(&Stage::STOP);
            *observed_inner.lock().unwrap() = Some(matches!(result, Err(Error::ReentrantTransition { .. })));
            Ok(())
        })
        .unwrap();

    lifecycle.execute_to(&Stage::START).unwrap();

    assert_eq!(*observed.lock().unwrap(), Some(true));
    assert_eq!(lifecycle.current_stage(), Some(Stage::START));
}

#[test]
fn test_execute_to_reached_stage_from_inside_an_action_is_noop() {
    let lifecycle = Arc::new(Lifecycle::standard());
    let inner = Arc::clone(&lifecycle);

    lifecycle
        .add_listener(Stage::START, move |_: &Stage| {
            inner.execute_to(&Stage::CONFIGURE)?;
            Ok(())
        })
        .unwrap();

    lifecycle.execute_to(&Stage::START).expect("backward target inside an action is a no-op");
    assert_eq!(lifecycle.current_stage(), Some(Stage::START));
}

#[test]
fn test_shared_listener_receives_each_stage() {
    struct Recorder(Log);
    impl Listener for Recorder {
        fn on_stage(&self, stage: &Stage) -> Result<(), ActionError> {
            self.0.lock().unwrap().push(stage.to_string());
            Ok(())
        }
    }

    let lifecycle = Lifecycle::standard();
    let log = new_log();
    let stages: Vec<Stage> = lifecycle.stages().iter().cloned().collect();
    let outcome = lifecycle
        .add_shared_listener(&stages, Arc::new(Recorder(Arc::clone(&log))))
        .unwrap();
    assert_eq!(outcome.registered, 3);

    lifecycle.execute_to(&Stage::STOP).unwrap();
    assert_eq!(entries(&log), vec!["configure", "start", "stop"]);
}

#[tokio::test]
async fn test_subscribe_and_wait_for_track_progress() {
    let lifecycle = Arc::new(Lifecycle::standard());
    let mut progress = lifecycle.subscribe();
    assert_eq!(*progress.borrow(), None);

    let driver = Arc::clone(&lifecycle);
    let handle = tokio::task::spawn_blocking(move || driver.execute_to(&Stage::START));

    lifecycle.wait_for(&Stage::START).await.expect("wait_for should resolve");
    handle.await.expect("driver task").expect("execute_to");

    progress.changed().await.expect("sender alive");
    assert_eq!(*progress.borrow(), Some(Stage::START));

    // Already reached stages resolve immediately
    lifecycle.wait_for(&Stage::CONFIGURE).await.unwrap();
    assert!(lifecycle.wait_for(&Stage::new("nope")).await.is_err());
}
