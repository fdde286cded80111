mod common;

use common::{fork_join, with_steps, Journal, Step, AFTER_JOIN, NESTED};
use parallel_gateway::authoring::graph_from_yaml;
use parallel_gateway::context::LATCH_WAIT_TIME_MS;
use parallel_gateway::pool::WorkerPool;
use parallel_gateway::{
    ConcurrencyFailure, ConfigurationError, EngineConfig, EngineError, EnterOutcome,
    ProcessEngine, ProcessInstance, ProcessState, Request,
};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn wait_request(ms: u64) -> Request {
    Request::from([(LATCH_WAIT_TIME_MS.to_string(), json!(ms))])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_orchestrated_fork_continues_past_join_once() {
    let journal = Journal::new();
    let config = with_steps(EngineConfig::builder(), &journal, &["a", "b", "c"])
        .service_orchestration(true)
        .worker_pool(WorkerPool::new(4).unwrap())
        .build()
        .unwrap();
    let engine = ProcessEngine::new(fork_join("order", &["a", "b", "c"]), config);

    let instance = engine.start(Request::new()).await.unwrap();

    for branch in ["a", "b", "c"] {
        assert_eq!(journal.count(branch), 1, "branch {branch}");
    }
    assert_eq!(journal.count(AFTER_JOIN), 1);
    assert_eq!(journal.names().last().map(String::as_str), Some(AFTER_JOIN));
    assert!(matches!(instance.state().await, ProcessState::Completed { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_orchestrated_fork_is_suspended_and_leaves_parent_context_alone() {
    let journal = Journal::new();
    let config = with_steps(EngineConfig::builder(), &journal, &["a", "b"])
        .service_orchestration(true)
        .worker_pool(WorkerPool::new(2).unwrap())
        .build()
        .unwrap();
    let engine = ProcessEngine::new(fork_join("order", &["a", "b"]), config);
    let instance = Arc::new(ProcessInstance::new("order"));
    let ctx = engine.context(Request::new(), Arc::clone(&instance));
    let fork = engine.graph().find("fork").unwrap();

    let outcome = engine.enter(Arc::clone(&ctx), fork).await.unwrap();

    assert_eq!(outcome, EnterOutcome::Suspended);
    assert_eq!(ctx.handoff().get().await, None);
    assert_eq!(journal.count(AFTER_JOIN), 1);
    // Joins record nothing in this mode.
    let executions = instance.executions().await;
    assert!(executions.iter().all(|r| r.activity_id != "join"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_latch_timeout_with_first_branch_running_does_not_continue() {
    let journal = Journal::new();
    let config = EngineConfig::builder()
        .service_orchestration(true)
        .worker_pool(WorkerPool::new(2).unwrap())
        .delegate("a", Step::slow("a", &journal, Duration::from_millis(300)))
        .delegate("b", Step::ok("b", &journal))
        .delegate(AFTER_JOIN, Step::ok(AFTER_JOIN, &journal))
        .build()
        .unwrap();
    let engine = ProcessEngine::new(fork_join("order", &["a", "b"]), config);

    let started = Instant::now();
    let instance = engine.start(wait_request(20)).await.unwrap();

    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(journal.count("a"), 0);
    assert_eq!(journal.count(AFTER_JOIN), 0);
    assert_eq!(instance.state().await, ProcessState::Running);

    // The outstanding branch was detached, not cancelled.
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert_eq!(journal.count("a"), 1);
    assert_eq!(journal.count(AFTER_JOIN), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_latch_timeout_with_first_branch_done_continues() {
    let journal = Journal::new();
    let config = EngineConfig::builder()
        .service_orchestration(true)
        .worker_pool(WorkerPool::new(2).unwrap())
        .delegate("a", Step::ok("a", &journal))
        .delegate("b", Step::slow("b", &journal, Duration::from_millis(300)))
        .delegate(AFTER_JOIN, Step::ok(AFTER_JOIN, &journal))
        .build()
        .unwrap();
    let engine = ProcessEngine::new(fork_join("order", &["a", "b"]), config);

    engine.start(wait_request(100)).await.unwrap();

    assert_eq!(journal.count("a"), 1);
    assert_eq!(journal.count("b"), 0);
    assert_eq!(journal.count(AFTER_JOIN), 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(journal.count("b"), 1);
    assert_eq!(journal.count(AFTER_JOIN), 1, "continuation ran once");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_first_branch_failure_is_surfaced() {
    let journal = Journal::new();
    let config = EngineConfig::builder()
        .service_orchestration(true)
        .worker_pool(WorkerPool::new(2).unwrap())
        .delegate("a", Step::failing("a", &journal))
        .delegate("b", Step::ok("b", &journal))
        .delegate(AFTER_JOIN, Step::ok(AFTER_JOIN, &journal))
        .build()
        .unwrap();
    let engine = ProcessEngine::new(fork_join("order", &["a", "b"]), config);

    let err = engine.start(Request::new()).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::Concurrency(ConcurrencyFailure::BranchFailed { ref target, .. }) if target == "a"
    ));
    assert_eq!(journal.count(AFTER_JOIN), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_finished_sibling_failure_is_surfaced() {
    let journal = Journal::new();
    let config = EngineConfig::builder()
        .service_orchestration(true)
        .worker_pool(WorkerPool::new(2).unwrap())
        .delegate("a", Step::slow("a", &journal, Duration::from_millis(50)))
        .delegate("b", Step::failing("b", &journal))
        .delegate(AFTER_JOIN, Step::ok(AFTER_JOIN, &journal))
        .build()
        .unwrap();
    let engine = ProcessEngine::new(fork_join("order", &["a", "b"]), config);

    let err = engine.start(Request::new()).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::Concurrency(ConcurrencyFailure::BranchFailed { ref target, .. }) if target == "b"
    ));
    assert_eq!(journal.count("a"), 1);
    assert_eq!(journal.count(AFTER_JOIN), 0);
}

#[tokio::test]
async fn test_orchestration_without_pool_is_configuration_error() {
    let journal = Journal::new();
    let config = with_steps(EngineConfig::builder(), &journal, &["a", "b"])
        .service_orchestration(true)
        .build()
        .unwrap();
    let engine = ProcessEngine::new(fork_join("order", &["a", "b"]), config);

    let err = engine.start(Request::new()).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::Configuration(ConfigurationError::MissingWorkerPool(ref id)) if id == "fork"
    ));
    assert!(journal.names().is_empty());
}

#[tokio::test]
async fn test_non_integer_latch_wait_is_rejected() {
    let journal = Journal::new();
    let config = with_steps(EngineConfig::builder(), &journal, &["a", "b"])
        .service_orchestration(true)
        .worker_pool(WorkerPool::new(2).unwrap())
        .build()
        .unwrap();
    let engine = ProcessEngine::new(fork_join("order", &["a", "b"]), config);
    let request = Request::from([(LATCH_WAIT_TIME_MS.to_string(), json!("fast"))]);

    let err = engine.start(request).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::Configuration(ConfigurationError::InvalidRequestOption { .. })
    ));
    assert!(journal.names().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_nested_orchestrated_fork_on_single_permit_pool() {
    let journal = Journal::new();
    let mut builder = EngineConfig::builder()
        .service_orchestration(true)
        .worker_pool(WorkerPool::new(1).unwrap());
    for task in ["a", "b", "c", "d"] {
        builder = builder.delegate(task, Step::ok(task, &journal));
    }
    let engine = ProcessEngine::new(graph_from_yaml(NESTED).unwrap(), builder.build().unwrap());

    let instance = tokio::time::timeout(Duration::from_secs(5), engine.start(Request::new()))
        .await
        .expect("nested fork finished on a one-permit pool")
        .unwrap();

    for task in ["a", "b", "c", "d"] {
        assert_eq!(journal.count(task), 1, "task {task}");
    }
    let names = journal.names();
    let position = |task: &str| names.iter().position(|n| n == task);
    assert!(position("b") < position("d") && position("c") < position("d"));
    assert!(matches!(instance.state().await, ProcessState::Completed { .. }));
}
