use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use sandworm_domain::RemoteLoggerFactory;
use sandworm_testing_utils::TestEnv;
use sandworm_worker::HttpRemoteLoggerFactory;

#[derive(Clone, Default)]
struct Sink {
    lines: Arc<Mutex<Vec<Value>>>,
    hits: Arc<AtomicUsize>,
    slow_first: bool,
}

impl Sink {
    fn lines(&self) -> Vec<Value> {
        self.lines.lock().unwrap().clone()
    }

    fn tags(&self) -> Vec<String> {
        self.lines()
            .iter()
            .map(|line| line["tag"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    async fn wait_for_lines(&self, count: usize) -> bool {
        TestEnv::wait_for(
            || {
                let lines = self.lines.clone();
                async move { lines.lock().unwrap().len() >= count }
            },
            Duration::from_secs(5),
        )
        .await
    }
}

async fn collect(State(sink): State<Sink>, Json(body): Json<Value>) -> StatusCode {
    if sink.hits.fetch_add(1, Ordering::SeqCst) == 0 && sink.slow_first {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    sink.lines.lock().unwrap().push(body);
    StatusCode::NO_CONTENT
}

async fn start_sink(slow_first: bool) -> (String, Sink) {
    let sink = Sink {
        slow_first,
        ..Sink::default()
    };
    let app = Router::new()
        .route("/logs", post(collect))
        .with_state(sink.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/logs"), sink)
}

#[tokio::test]
async fn test_log_lines_are_posted_as_json() {
    let (endpoint, sink) = start_sink(false).await;
    let factory = HttpRemoteLoggerFactory::new(Duration::from_secs(2));
    let logger = factory.open(&endpoint);

    logger.log("scheduler/pull", "Pulling image app from registry.local:5000");
    logger.log("scheduler/run/onComplete", "Container abc has finished");

    assert!(sink.wait_for_lines(2).await);
    assert_eq!(
        sink.lines(),
        vec![
            json!({
                "tag": "scheduler/pull",
                "message": "Pulling image app from registry.local:5000"
            }),
            json!({
                "tag": "scheduler/run/onComplete",
                "message": "Container abc has finished"
            }),
        ]
    );
}

#[tokio::test]
async fn test_lines_arrive_in_logged_order_behind_a_slow_delivery() {
    let (endpoint, sink) = start_sink(true).await;
    let factory = HttpRemoteLoggerFactory::new(Duration::from_secs(2));
    let logger = factory.open(&endpoint);

    logger.log("scheduler/pull", "Pulling image app");
    logger.log("scheduler/pull/start", "Pulling fs layer");
    logger.log("scheduler/pull/done", "Pull complete");
    logger.log("scheduler/run/onComplete", "Container abc has finished");

    assert!(sink.wait_for_lines(4).await);
    assert_eq!(
        sink.tags(),
        vec![
            "scheduler/pull",
            "scheduler/pull/start",
            "scheduler/pull/done",
            "scheduler/run/onComplete",
        ]
    );
}

#[tokio::test]
async fn test_unreachable_sink_does_not_affect_other_loggers() {
    let (endpoint, sink) = start_sink(false).await;
    let factory = HttpRemoteLoggerFactory::new(Duration::from_millis(200));

    let dead = factory.open("http://127.0.0.1:9/logs");
    dead.log("scheduler/pull/error", "nobody is listening");
    dead.log("scheduler/pull/error", "still nobody");

    let live = factory.open(&endpoint);
    live.log("scheduler/run/onComplete", "Container abc has finished");

    assert!(sink.wait_for_lines(1).await);
    assert_eq!(sink.tags(), vec!["scheduler/run/onComplete"]);
}

#[test]
fn test_logging_outside_runtime_is_dropped() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (endpoint, sink) = runtime.block_on(start_sink(false));

    let factory = HttpRemoteLoggerFactory::new(Duration::from_secs(1));
    let logger = factory.open(&endpoint);
    logger.log("scheduler/pull", "no runtime here");

    runtime.block_on(async { tokio::time::sleep(Duration::from_millis(300)).await });
    assert!(sink.lines().is_empty());
}
