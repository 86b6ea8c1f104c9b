//! Integration tests for the check cycle and scheduler against mock servers.
//!
//! Run with: cargo test -p costsentry --test cycle_mock_server_tests

#![allow(clippy::unwrap_used)]

mod common;

use std::path::PathBuf;
use std::time::Duration;

use common::{usage_response, write_fixture, START_TIME};
use costsentry::monitor::{CheckCycle, CycleOutcome, Scheduler};
use costsentry::usage::UsageClient;
use wiremock::matchers::{any, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cycle_against(fixture_config: &std::path::Path, usage_server: &MockServer) -> CheckCycle {
    CheckCycle::new(fixture_config.to_path_buf(), false)
        .with_usage_client(UsageClient::with_endpoint(usage_server.uri().parse().unwrap()))
}

#[tokio::test]
async fn breach_dispatches_exactly_one_webhook() {
    let usage_server = MockServer::start().await;
    let webhook_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/20200107/usage"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(usage_response(&[(75.25, "USD"), (30.0, "USD")])),
        )
        .expect(1)
        .mount(&usage_server)
        .await;

    // The alert must name the amount, the threshold and the start time.
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_string_contains("105.25"))
        .and(body_string_contains("100.00"))
        .and(body_string_contains(START_TIME))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 0})))
        .expect(1)
        .mount(&webhook_server)
        .await;

    let fixture = write_fixture(
        "100.0",
        "webhook",
        Some(&format!("{}/hook", webhook_server.uri())),
    );

    let outcome = cycle_against(&fixture.config_path, &usage_server).run_once().await;
    assert!(matches!(outcome, CycleOutcome::ThresholdExceeded(_)));
}

#[tokio::test]
async fn cost_equal_to_threshold_does_not_alert() {
    let usage_server = MockServer::start().await;
    let webhook_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/20200107/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(usage_response(&[(100.0, "USD")])))
        .mount(&usage_server)
        .await;

    // Strict greater-than: equality must not reach the webhook.
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&webhook_server)
        .await;

    let fixture = write_fixture(
        "100.0",
        "webhook",
        Some(&format!("{}/hook", webhook_server.uri())),
    );

    let outcome = cycle_against(&fixture.config_path, &usage_server).run_once().await;
    assert!(matches!(outcome, CycleOutcome::WithinThreshold(_)));
}

#[tokio::test]
async fn fetch_failure_sends_no_alert() {
    let usage_server = MockServer::start().await;
    let webhook_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/20200107/usage"))
        .respond_with(ResponseTemplate::new(500).set_body_string("InternalServerError"))
        .mount(&usage_server)
        .await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&webhook_server)
        .await;

    let fixture = write_fixture(
        "0",
        "webhook",
        Some(&format!("{}/hook", webhook_server.uri())),
    );

    let outcome = cycle_against(&fixture.config_path, &usage_server).run_once().await;
    assert_eq!(outcome, CycleOutcome::FetchFailed);
}

#[tokio::test]
async fn log_method_makes_no_network_calls_beyond_the_fetch() {
    let usage_server = MockServer::start().await;
    let webhook_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/20200107/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(usage_response(&[(105.25, "USD")])))
        .mount(&usage_server)
        .await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&webhook_server)
        .await;

    let fixture = write_fixture("100.0", "log", None);

    let outcome = cycle_against(&fixture.config_path, &usage_server).run_once().await;
    assert!(matches!(outcome, CycleOutcome::ThresholdExceeded(_)));
}

#[tokio::test]
async fn unloadable_config_skips_the_cycle() {
    let cycle = CheckCycle::new(PathBuf::from("/nonexistent/config.ini"), false);
    assert_eq!(cycle.run_once().await, CycleOutcome::ConfigFailed);
}

#[tokio::test]
async fn scheduler_runs_an_immediate_first_check() {
    let usage_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/20200107/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(usage_response(&[(1.0, "USD")])))
        .mount(&usage_server)
        .await;

    let fixture = write_fixture("100.0", "log", None);
    let cycle = cycle_against(&fixture.config_path, &usage_server);
    let scheduler = Scheduler::new(cycle, Duration::from_secs(60 * 60));

    let handle = tokio::spawn(async move { scheduler.run().await });
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.abort();

    // Exactly one check: the immediate run, with the next one an hour out.
    assert_eq!(usage_server.received_requests().await.unwrap().len(), 1);
}
