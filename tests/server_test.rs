//! Tests against a real listening socket.

mod common;

use common::TestPointBuilder;
use scollector_exporter::core::Config;
use scollector_exporter::Application;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

async fn start_server() -> (SocketAddr, oneshot::Sender<()>, JoinHandle<scollector_exporter::Result<()>>) {
    let app = Application::new(Config::default()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(app.serve(listener, async {
        let _ = stop_rx.await;
    }));
    (addr, stop_tx, handle)
}

#[tokio::test]
async fn test_push_then_scrape_over_tcp() {
    let (addr, stop, server) = start_server().await;
    let client = reqwest::Client::new();

    let batch = vec![
        TestPointBuilder::new("os.cpu").value("counter").build(),
        TestPointBuilder::new("os.cpu").value(12).tag("host", "web01").build(),
    ];
    let response = client
        .post(format!("http://{}/api/put", addr))
        .json(&batch)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

    let response = client
        .get(format!("http://{}/metrics", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; version=0.0.4; charset=utf-8"
    );
    let body = response.text().await.unwrap();
    assert!(body.contains("# TYPE os_cpu counter\n"));
    assert!(body.contains("os_cpu{instance=\"web01\"} 12\n"));

    drop(client);
    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_method_not_allowed_over_tcp() {
    let (addr, stop, server) = start_server().await;

    let response = reqwest::get(format!("http://{}/api/put", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.text().await.unwrap(), "Only POST is allowed\n");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}
