// tests/dev_service.rs

mod common;

use std::sync::Arc;

use common::*;
use devwatch::lifecycle::Service;
use devwatch::orchestrator::{DevService, Orchestration};
use devwatch::provider::{Provider, ProviderRegistry, ServiceEntry};
use devwatch::types::ExitStatus;

fn service(providers: Vec<Arc<dyn Provider>>, entries: Vec<ServiceEntry>) -> (DevService, CapturedLog) {
    init_tracing();
    let ctx = test_context(&std::env::temp_dir(), Arc::new(FakeSource::new()));
    let service = DevService::new(Orchestration::new(ProviderRegistry::new(providers), entries, ctx));
    let log = CapturedLog::new();
    service.set_logger(log.sink());
    (service, log)
}

#[tokio::test]
async fn nothing_to_do_is_success() {
    let (svc, _) = service(Vec::new(), Vec::new());
    assert_eq!(with_timeout(svc.start()).await, ExitStatus::Success);
}

#[tokio::test]
async fn only_init_services_are_initialised() {
    let calls_log = call_log();
    let (svc, log) = service(
        vec![
            FakeProvider::new("binaries", &calls_log).shared(),
            FakeProvider::new("css", &calls_log).shared(),
        ],
        vec![
            ServiceBuilder::new("bin", "binaries").init_only().build(),
            ServiceEntry::new("styles", "css"),
        ],
    );

    assert_eq!(with_timeout(svc.start()).await, ExitStatus::Success);
    assert_eq!(calls(&calls_log), vec!["init:bin"]);
    assert!(log.contains("1 init service(s) complete"));
}

#[tokio::test]
async fn first_init_error_is_a_failure() {
    let calls_log = call_log();
    let (svc, log) = service(
        vec![
            FakeProvider::new("first", &calls_log).order(1).failing_init("no network").shared(),
            FakeProvider::new("second", &calls_log).order(2).shared(),
        ],
        vec![
            ServiceBuilder::new("a", "first").init_only().build(),
            ServiceBuilder::new("b", "second").init_only().build(),
        ],
    );

    assert_eq!(with_timeout(svc.start()).await, ExitStatus::Failure);
    assert_eq!(calls(&calls_log), vec!["init:a"]);
    assert!(log.contains("Init failed for service 'a'"), "{:?}", log.lines());
}

#[tokio::test]
async fn missing_provider_is_a_failure() {
    let calls_log = call_log();
    let (svc, log) = service(
        vec![FakeProvider::new("binaries", &calls_log).shared()],
        vec![
            ServiceBuilder::new("bin", "binaries").init_only().build(),
            ServiceEntry::new("styles", "not-registered"),
        ],
    );

    assert_eq!(with_timeout(svc.start()).await, ExitStatus::Failure);
    assert!(calls(&calls_log).is_empty());
    assert!(log.contains("unknown provider 'not-registered'"));
}
