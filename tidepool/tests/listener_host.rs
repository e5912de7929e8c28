//! Drain-and-rebind behaviour of the listener host.

mod common;

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use common::{http_client, init_tracing};
use reqwest::StatusCode;
use tidepool::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn slow_router() -> Router {
    Router::new()
        .route("/fast", get(|| async { "ok" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                "done"
            }),
        )
}

async fn bind(policy: RestartPolicy) -> ListenerHost {
    ListenerHost::bind(
        ListenerEndpoint::new("test", "127.0.0.1:0".parse().unwrap()),
        slow_router(),
        policy,
    )
    .await
    .unwrap()
}

fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

#[tokio::test]
async fn test_drain_completes_accepted_requests() {
    init_tracing();
    let host = bind(RestartPolicy::default()).await;
    let addr = host.local_addr();
    let client = http_client();

    let slow = tokio::spawn({
        let client = client.clone();
        async move { client.get(url(addr, "/slow")).send().await?.text().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(host.request_restart().unwrap(), RestartOutcome::Started);
    assert_eq!(slow.await.unwrap().unwrap(), "done");

    within(host.wait_for_generation(1)).await.unwrap();
    assert_eq!(host.state(), HostState::Listening);
    assert_eq!(host.local_addr(), addr);

    let response = client.get(url(addr, "/fast")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");

    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_new_connections_during_drain_are_refused() {
    let host = bind(RestartPolicy::default()).await;
    let addr = host.local_addr();
    let client = http_client();

    let slow = tokio::spawn({
        let client = client.clone();
        async move { client.get(url(addr, "/slow")).send().await?.text().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    host.request_restart().unwrap();
    assert_eq!(host.state(), HostState::Draining);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(client.get(url(addr, "/fast")).send().await.is_err());

    assert_eq!(slow.await.unwrap().unwrap(), "done");
    within(host.wait_for_generation(1)).await.unwrap();

    let response = client.get(url(addr, "/fast")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_in_flight_on_accepted_connection_is_served() {
    let host = bind(RestartPolicy::default()).await;
    let addr = host.local_addr();

    // Headers only partly sent when the drain begins.
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /fast HTTP/1.1\r\nHost: tidepool\r\nConnection: close\r\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(host.request_restart().unwrap(), RestartOutcome::Started);
    stream.write_all(b"\r\n").await.unwrap();

    let mut response = String::new();
    within(stream.read_to_string(&mut response)).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("ok"), "{response}");

    within(host.wait_for_generation(1)).await.unwrap();
}

#[tokio::test]
async fn test_restart_requests_coalesce() {
    let host = bind(RestartPolicy::default().with_delay(Duration::from_millis(200))).await;

    assert_eq!(host.schedule_restart().unwrap(), RestartOutcome::Scheduled);
    assert_eq!(host.schedule_restart().unwrap(), RestartOutcome::AlreadyInProgress);
    assert_eq!(host.request_restart().unwrap(), RestartOutcome::AlreadyInProgress);
    assert_eq!(host.state(), HostState::Listening);

    within(host.wait_for_generation(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(host.generation(), 1);

    // Completion clears the flag.
    assert_eq!(host.schedule_restart().unwrap(), RestartOutcome::Scheduled);
    within(host.wait_for_generation(2)).await.unwrap();
    assert_eq!(host.state(), HostState::Listening);
}

#[tokio::test]
async fn test_scheduled_restart_uses_default_delay() {
    let host = bind(RestartPolicy::default()).await;
    let addr = host.local_addr();

    host.schedule_restart().unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(host.generation(), 0);
    assert_eq!(host.state(), HostState::Listening);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    within(host.wait_for_generation(1)).await.unwrap();

    let response = http_client().get(url(addr, "/fast")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_arms_restart() {
    let policy = RestartPolicy::default()
        .with_delay(Duration::from_millis(100))
        .with_arm_on_request(true);
    let host = bind(policy).await;
    let addr = host.local_addr();
    let client = http_client();

    let response = client.get(url(addr, "/fast")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    within(host.wait_for_generation(1)).await.unwrap();
    assert_eq!(host.state(), HostState::Listening);

    let response = client.get(url(addr, "/fast")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    within(host.wait_for_generation(2)).await.unwrap();
}

#[tokio::test]
async fn test_shutdown_cancels_armed_restart() {
    let host = bind(RestartPolicy::default().with_delay(Duration::from_millis(200))).await;
    let addr = host.local_addr();

    host.schedule_restart().unwrap();
    within(host.shutdown()).await.unwrap();

    assert_eq!(host.state(), HostState::Stopped);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(host.generation(), 0);
    assert!(matches!(host.request_restart(), Err(HostError::NotRunning)));
    assert!(matches!(host.schedule_restart(), Err(HostError::NotRunning)));
    assert!(http_client().get(url(addr, "/fast")).send().await.is_err());
}

#[tokio::test]
async fn test_failed_rebind_stops_the_host() {
    let host = bind(RestartPolicy::default()).await;
    let addr = host.local_addr();
    let client = http_client();

    let slow = tokio::spawn({
        let client = client.clone();
        async move { client.get(url(addr, "/slow")).send().await?.text().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    host.request_restart().unwrap();

    // Take the port while the old listener is draining.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let squatter = tokio::net::TcpListener::bind(addr).await.unwrap();

    let watchers: Vec<_> = (0..2)
        .map(|_| {
            let host = host.clone();
            tokio::spawn(async move { host.wait().await })
        })
        .collect();

    assert_eq!(slow.await.unwrap().unwrap(), "done");
    for watcher in watchers {
        let outcome = within(watcher).await.unwrap();
        assert!(matches!(outcome, Err(HostError::Bind { addr: failed, .. }) if failed == addr));
    }
    assert!(matches!(within(host.wait()).await, Err(HostError::Bind { .. })));
    assert_eq!(host.state(), HostState::Stopped);

    drop(squatter);
}
