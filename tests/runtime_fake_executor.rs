// tests/runtime_fake_executor.rs

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use sitepipe::build::{BuildStep, StepOutcome, StepSet};
use sitepipe::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use sitepipe::errors::SitepipeError;
use sitepipe::types::BuildSequence;
use sitepipe_test_utils::fake_executor::{cycle_count, executed_steps, ExecutedLog, FakeExecutor};
use sitepipe_test_utils::{init_tracing, with_timeout};

fn request(seq: BuildSequence, reason: TriggerReason) -> RuntimeEvent {
    RuntimeEvent::CycleRequested {
        steps: StepSet::from(seq),
        reason,
    }
}

fn one_shot() -> RuntimeOptions {
    RuntimeOptions {
        exit_when_idle: true,
        start_server: false,
    }
}

#[tokio::test]
async fn build_runs_every_step_in_dependency_order() {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log: ExecutedLog = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log));

    tx.send(request(BuildSequence::Full, TriggerReason::Manual))
        .await
        .unwrap();

    let runtime = Runtime::new(CoreRuntime::new(one_shot()), rx, executor);
    with_timeout(runtime.run()).await.unwrap();

    let steps = executed_steps(&log);
    assert_eq!(steps.len(), 4);
    assert_eq!(steps[0], BuildStep::Clean);
    assert_eq!(steps[3], BuildStep::Generate);
    assert!(steps[1..3].contains(&BuildStep::CompileScripts));
    assert!(steps[1..3].contains(&BuildStep::CompileStyles));
}

#[tokio::test]
async fn failed_generate_makes_one_shot_command_fail() {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log: ExecutedLog = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log))
        .with_outcome(BuildStep::Generate, StepOutcome::Failed(1));

    tx.send(request(BuildSequence::Generate, TriggerReason::Manual))
        .await
        .unwrap();

    let runtime = Runtime::new(CoreRuntime::new(one_shot()), rx, executor);
    let result = with_timeout(runtime.run()).await;

    match result {
        Err(SitepipeError::BuildFailed(msg)) => assert!(msg.contains("generate")),
        other => panic!("expected BuildFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn degraded_compile_still_generates_but_fails_one_shot() {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log: ExecutedLog = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log))
        .with_outcome(BuildStep::CompileStyles, StepOutcome::Degraded(2));

    tx.send(request(BuildSequence::Rebuild, TriggerReason::Manual))
        .await
        .unwrap();

    let runtime = Runtime::new(CoreRuntime::new(one_shot()), rx, executor);
    let result = with_timeout(runtime.run()).await;

    assert!(matches!(result, Err(SitepipeError::BuildFailed(_))));
    assert!(executed_steps(&log).contains(&BuildStep::Generate));
}

#[tokio::test]
async fn clean_failure_skips_everything_downstream() {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log: ExecutedLog = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log))
        .with_outcome(BuildStep::Clean, StepOutcome::Failed(-1));

    tx.send(request(BuildSequence::Full, TriggerReason::Manual))
        .await
        .unwrap();

    let runtime = Runtime::new(CoreRuntime::new(one_shot()), rx, executor);
    assert!(with_timeout(runtime.run()).await.is_err());
    assert_eq!(executed_steps(&log), vec![BuildStep::Clean]);
}

#[tokio::test]
async fn triggers_during_a_cycle_run_once_afterwards() {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log: ExecutedLog = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log))
        .with_delay(Duration::from_millis(100));

    let runtime = Runtime::new(CoreRuntime::new(RuntimeOptions::default()), rx, executor);
    let handle = tokio::spawn(runtime.run());

    tx.send(request(BuildSequence::Generate, TriggerReason::Manual))
        .await
        .unwrap();
    // All of these land while generate is still "running".
    for _ in 0..5 {
        tx.send(request(BuildSequence::Compile, TriggerReason::FileWatch))
            .await
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(600)).await;
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(handle).await.unwrap().unwrap();

    assert_eq!(cycle_count(&log), 2);
    assert_eq!(
        executed_steps(&log),
        vec![
            BuildStep::Generate,
            BuildStep::CompileScripts,
            BuildStep::CompileStyles
        ]
    );
}

#[tokio::test]
async fn watch_mode_keeps_running_after_a_failure() {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log: ExecutedLog = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log))
        .with_outcome(BuildStep::Generate, StepOutcome::Failed(1));

    let runtime = Runtime::new(CoreRuntime::new(RuntimeOptions::default()), rx, executor);
    let handle = tokio::spawn(runtime.run());

    tx.send(request(BuildSequence::Generate, TriggerReason::Manual))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(request(BuildSequence::Generate, TriggerReason::FileWatch))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();

    with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(cycle_count(&log), 2);
}

#[tokio::test]
async fn interrupted_one_shot_build_fails() {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log: ExecutedLog = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log))
        .with_delay(Duration::from_millis(300));

    tx.send(request(BuildSequence::Full, TriggerReason::Manual))
        .await
        .unwrap();
    let runtime = Runtime::new(CoreRuntime::new(one_shot()), rx, executor);
    let handle = tokio::spawn(runtime.run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();

    match with_timeout(handle).await.unwrap() {
        Err(SitepipeError::BuildFailed(msg)) => assert!(msg.contains("interrupted")),
        other => panic!("expected BuildFailed, got {other:?}"),
    }
    assert_eq!(executed_steps(&log), vec![BuildStep::Clean]);
}
