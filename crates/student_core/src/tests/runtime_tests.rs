use std::time::Duration;

use super::*;
use crate::testing::{RecordingNavigator, RecordingNotifier, StubServices};
use serde_json::json;
use shared::domain::{EnrollmentForm, FilterPatch};
use tokio::time::timeout;

fn runtime_with(services: StubServices) -> (Arc<StudentRuntime>, Arc<StubServices>) {
    let services = Arc::new(services);
    let runtime = StudentRuntime::new_with_dependencies(
        Settings {
            navigation_delay_ms: 0,
            ..Settings::default()
        },
        services.clone(),
        Arc::new(RecordingNotifier::default()),
        Arc::new(RecordingNavigator::default()),
    );
    (runtime, services)
}

async fn next_matching(
    signals: &mut broadcast::Receiver<Signal>,
    wanted: impl Fn(&Signal) -> bool,
) -> Signal {
    timeout(Duration::from_secs(5), async {
        loop {
            let signal = signals.recv().await.expect("signal bus open");
            if wanted(&signal) {
                return signal;
            }
        }
    })
    .await
    .expect("signal before timeout")
}

#[tokio::test]
async fn watcher_runs_load_flow_for_load_signal() {
    let (runtime, services) = runtime_with(
        StubServices::new().ok("queryStudents", json!([{ "Name": "Ada" }])),
    );
    let watcher = runtime.spawn_watcher();
    let mut signals = runtime.subscribe_signals();

    runtime.dispatch(Signal::LoadStudents(Some(json!({ "status": "active" }))));
    next_matching(&mut signals, |s| matches!(s, Signal::StudentsLoaded(_))).await;

    assert_eq!(runtime.state().students.len(), 1);
    assert!(!runtime.state().loading);
    assert_eq!(services.recorded_calls()[0].1.body, json!({ "status": "active" }));
    watcher.abort();
}

#[tokio::test]
async fn every_trigger_spawns_its_own_flow() {
    let (runtime, services) = runtime_with(
        StubServices::new()
            .ok("queryStudents", json!([]))
            .ok("queryStudents", json!([])),
    );
    let watcher = runtime.spawn_watcher();
    let mut signals = runtime.subscribe_signals();

    runtime.dispatch(Signal::LoadStudents(None));
    runtime.dispatch(Signal::LoadStudents(None));
    for _ in 0..2 {
        next_matching(&mut signals, |s| matches!(s, Signal::StudentsLoaded(_))).await;
    }

    assert_eq!(services.recorded_calls().len(), 2);
    watcher.abort();
}

#[tokio::test]
async fn triggers_beyond_bus_capacity_all_start_flows() {
    let services = Arc::new(
        StubServices::new()
            .ok("queryStudents", json!([]))
            .ok("queryStudents", json!([]))
            .ok("queryStudents", json!([])),
    );
    let runtime = StudentRuntime::new_with_dependencies(
        Settings {
            signal_capacity: 1,
            navigation_delay_ms: 0,
            ..Settings::default()
        },
        services.clone(),
        Arc::new(RecordingNotifier::default()),
        Arc::new(RecordingNavigator::default()),
    );
    let watcher = runtime.spawn_watcher();

    for _ in 0..3 {
        runtime.dispatch(Signal::LoadStudents(None));
    }

    timeout(Duration::from_secs(5), async {
        while services.recorded_calls().len() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("every trigger reaches the service");
    assert_eq!(services.recorded_calls().len(), 3);
    watcher.abort();
}

#[tokio::test]
async fn aborted_watcher_drops_its_trigger_feed() {
    let (runtime, services) = runtime_with(StubServices::new());
    let watcher = runtime.spawn_watcher();
    watcher.abort();
    let _ = watcher.await;

    runtime.dispatch(Signal::LoadStudents(None));
    tokio::task::yield_now().await;
    assert!(services.recorded_calls().is_empty());
}

#[tokio::test]
async fn enroll_and_load_run_independently() {
    let (runtime, services) = runtime_with(
        StubServices::new()
            .ok("createStudent", json!({ "id": 3, "Name": "Linus" }))
            .fail("queryStudents", shared::error::ServiceError::transport("offline")),
    );
    let watcher = runtime.spawn_watcher();
    let mut signals = runtime.subscribe_signals();

    runtime.dispatch(Signal::EnrollStudent(EnrollmentForm {
        name: Some("Linus".into()),
        ..EnrollmentForm::default()
    }));
    runtime.dispatch(Signal::LoadStudents(None));

    let mut enrolled = false;
    let mut load_failed = false;
    while !(enrolled && load_failed) {
        match next_matching(&mut signals, |s| {
            matches!(s, Signal::StudentEnrolled(_) | Signal::LoadError(_))
        })
        .await
        {
            Signal::StudentEnrolled(_) => enrolled = true,
            Signal::LoadError(_) => load_failed = true,
            _ => unreachable!(),
        }
    }

    let mut services_called: Vec<_> = services
        .recorded_calls()
        .into_iter()
        .map(|(service, _)| service)
        .collect();
    services_called.sort();
    assert_eq!(services_called, vec!["createStudent", "queryStudents"]);
    assert!(!runtime.state().loading);
    watcher.abort();
}

#[tokio::test]
async fn non_trigger_signals_do_not_spawn_flows() {
    let (runtime, services) = runtime_with(StubServices::new());
    assert!(runtime.spawn_flow(&Signal::LoadingStudents).is_none());
    assert!(runtime.spawn_flow(&Signal::Logout).is_none());
    assert!(services.recorded_calls().is_empty());
}

#[tokio::test]
async fn state_watchers_see_dispatched_changes_and_logout() {
    let (runtime, _) = runtime_with(StubServices::new());
    let mut state = runtime.watch_state();

    runtime.dispatch(Signal::SetStudentFilter(FilterPatch::grade("9")));
    state.changed().await.expect("store alive");
    assert_eq!(state.borrow_and_update().filters.grade.as_deref(), Some("9"));

    runtime.dispatch(Signal::Logout);
    state.changed().await.expect("store alive");
    assert_eq!(**state.borrow_and_update(), StudentListState::default());
}

#[tokio::test]
async fn runtime_without_backend_reports_unavailable() {
    let runtime = StudentRuntime::new(Settings::default());
    let report = runtime
        .spawn_flow(&Signal::LoadStudents(None))
        .expect("load is a trigger")
        .await
        .expect("flow task");

    assert_eq!(
        report.error.map(|e| e.code),
        Some(shared::error::ErrorCode::Unavailable)
    );
    assert!(runtime.state().error.is_some());
}
