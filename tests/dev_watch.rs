// tests/dev_watch.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use devwatch::lifecycle::Service;
use devwatch::orchestrator::{DevWatchService, Orchestration};
use devwatch::provider::{Provider, ProviderRegistry, ServiceEntry};
use devwatch::types::ExitStatus;

fn service(providers: Vec<Arc<dyn Provider>>, entries: Vec<ServiceEntry>) -> (Arc<DevWatchService>, CapturedLog) {
    init_tracing();
    let ctx = test_context(&std::env::temp_dir(), Arc::new(FakeSource::new()));
    let orchestration = Orchestration::new(ProviderRegistry::new(providers), entries, ctx);
    let service = DevWatchService::new(orchestration).with_shutdown_grace(Duration::from_millis(200));
    let log = CapturedLog::new();
    service.set_logger(log.sink());
    (Arc::new(service), log)
}

async fn wait_for_calls(log: &CallLog, wanted: &[&str]) {
    with_timeout(async {
        loop {
            let seen = calls(log);
            if wanted.iter().all(|w| seen.iter().any(|c| c == w)) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
}

#[tokio::test]
async fn empty_service_map_succeeds() {
    let (svc, _log) = service(Vec::new(), Vec::new());
    assert_eq!(with_timeout(svc.start()).await, ExitStatus::Success);
}

#[tokio::test]
async fn unregistered_provider_fails_before_anything_starts() {
    let calls_log = call_log();
    let (svc, log) = service(
        vec![FakeProvider::new("css", &calls_log).shared()],
        vec![ServiceEntry::new("styles", "css"), ServiceEntry::new("mystery", "nope")],
    );

    assert_eq!(with_timeout(svc.start()).await, ExitStatus::Failure);
    assert!(calls(&calls_log).is_empty());
    assert!(log.contains("Configuration error"), "{:?}", log.lines());
}

#[tokio::test]
async fn inits_in_order_then_watches_until_stopped() {
    let calls_log = call_log();
    let (svc, log) = service(
        vec![
            FakeProvider::new("binaries", &calls_log).order(10).shared(),
            FakeProvider::new("css", &calls_log).order(20).depends_on("binaries").shared(),
            FakeProvider::new("reload", &calls_log).order(30).shared(),
        ],
        vec![
            ServiceBuilder::new("bin", "binaries").init_only().build(),
            ServiceEntry::new("styles", "css"),
            ServiceEntry::new("hot", "reload"),
        ],
    );

    let run = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.start().await })
    };
    wait_for_calls(&calls_log, &["watch:styles", "watch:hot"]).await;
    svc.stop();

    assert_eq!(with_timeout(run).await.unwrap(), ExitStatus::Success);

    let seen = calls(&calls_log);
    assert_eq!(&seen[..3], &["init:bin", "init:styles", "init:hot"]);
    assert!(!seen.contains(&"watch:bin".to_string()));
    assert!(seen.contains(&"stopped:styles".to_string()));
    assert!(seen.contains(&"stopped:hot".to_string()));
    assert!(log.contains("All services stopped cleanly"));
}

#[tokio::test]
async fn first_failure_stops_the_siblings() {
    let calls_log = call_log();
    let (svc, log) = service(
        vec![
            FakeProvider::new("steady", &calls_log).shared(),
            FakeProvider::new("flaky", &calls_log)
                .watch(WatchMode::ExitAfter(Duration::from_millis(30), ExitStatus::Failure))
                .shared(),
        ],
        vec![ServiceEntry::new("a", "steady"), ServiceEntry::new("b", "flaky")],
    );

    assert_eq!(with_timeout(svc.start()).await, ExitStatus::Failure);
    assert!(calls(&calls_log).contains(&"stopped:a".to_string()));
    assert!(log.contains("Service 'b' failed"), "{:?}", log.lines());
    assert!(log.contains("Failed services: b"));
}

#[tokio::test]
async fn watch_error_is_isolated_to_a_failure_status() {
    let calls_log = call_log();
    let (svc, log) = service(
        vec![
            FakeProvider::new("steady", &calls_log).shared(),
            FakeProvider::new("broken", &calls_log)
                .watch(WatchMode::Fail("compiler crashed".into()))
                .shared(),
        ],
        vec![ServiceEntry::new("a", "steady"), ServiceEntry::new("b", "broken")],
    );

    assert_eq!(with_timeout(svc.start()).await, ExitStatus::Failure);
    assert!(log.contains("compiler crashed"), "{:?}", log.lines());
    assert!(calls(&calls_log).contains(&"stopped:a".to_string()));
}

#[tokio::test]
async fn init_failure_prevents_watch_tasks() {
    let calls_log = call_log();
    let (svc, log) = service(
        vec![
            FakeProvider::new("binaries", &calls_log).order(10).failing_init("offline").shared(),
            FakeProvider::new("css", &calls_log).order(20).shared(),
        ],
        vec![ServiceEntry::new("bin", "binaries"), ServiceEntry::new("styles", "css")],
    );

    assert_eq!(with_timeout(svc.start()).await, ExitStatus::Failure);
    assert_eq!(calls(&calls_log), vec!["init:bin"]);
    assert!(log.contains("failed to initialise: offline"), "{:?}", log.lines());
}

#[tokio::test]
async fn unresponsive_task_is_aborted_after_the_grace_period() {
    let calls_log = call_log();
    let (svc, log) = service(
        vec![
            FakeProvider::new("steady", &calls_log).shared(),
            FakeProvider::new("stubborn", &calls_log).watch(WatchMode::IgnoreShutdown).shared(),
        ],
        vec![ServiceEntry::new("a", "steady"), ServiceEntry::new("b", "stubborn")],
    );

    let run = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.start().await })
    };
    wait_for_calls(&calls_log, &["watch:a", "watch:b"]).await;
    svc.stop();

    assert_eq!(with_timeout(run).await.unwrap(), ExitStatus::Failure);
    assert!(log.contains("Failed services: b"), "{:?}", log.lines());
}
