// HTTP connectivity probe tests against local listeners

mod common;

use std::time::{Duration, Instant};

use hostwatch::connectivity::{ConnectivityProbe, HttpProbe};

#[tokio::test]
async fn test_probe_reachable_when_host_answers() {
    let (url, server) = common::spawn_http_server("200 OK").await;
    let probe = HttpProbe::new(vec![url]).unwrap();
    assert!(probe.is_reachable(Duration::from_secs(2)).await);
    server.await.unwrap();
}

#[tokio::test]
async fn test_probe_counts_error_status_as_reachable() {
    let (url, server) = common::spawn_http_server("503 Service Unavailable").await;
    let probe = HttpProbe::new(vec![url]).unwrap();
    assert!(probe.is_reachable(Duration::from_secs(2)).await);
    server.await.unwrap();
}

#[tokio::test]
async fn test_probe_does_not_follow_redirects() {
    let (url, server) = common::spawn_http_server("301 Moved Permanently").await;
    let probe = HttpProbe::new(vec![url]).unwrap();
    assert!(probe.is_reachable(Duration::from_secs(2)).await);
    server.await.unwrap();
}

#[tokio::test]
async fn test_probe_unreachable_when_no_host_answers() {
    let hosts = vec![common::closed_port_url().await, common::closed_port_url().await];
    let probe = HttpProbe::new(hosts).unwrap();
    assert!(!probe.is_reachable(Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_probe_falls_through_to_next_host() {
    let dead = common::closed_port_url().await;
    let (live, server) = common::spawn_http_server("200 OK").await;
    let probe = HttpProbe::new(vec![dead, live]).unwrap();
    assert!(probe.is_reachable(Duration::from_secs(2)).await);
    server.await.unwrap();
}

#[tokio::test]
async fn test_probe_attempt_is_bounded_by_timeout() {
    // Accepts but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    let probe = HttpProbe::new(vec![format!("http://{addr}")]).unwrap();

    let started = Instant::now();
    assert!(!probe.is_reachable(Duration::from_millis(200)).await);
    assert!(started.elapsed() < Duration::from_secs(5));
}
