//! Test data builders

use sandworm_domain::{ExecutionRecord, WorkerId};

pub const TEST_REGISTRY: &str = "registry.test:5000";

pub fn log_endpoint(image: &str) -> String {
    format!("http://logs.test/{image}")
}

/// Record for `image` with a per-image log endpoint so log lines can be
/// attributed to the job that produced them.
pub fn record(image: &str) -> ExecutionRecord {
    ExecutionRecord::new(TEST_REGISTRY, image, log_endpoint(image))
}

/// `count` distinct worker endpoints, `tcp://10.0.0.1:2375` upward.
pub fn worker_ids(count: usize) -> Vec<WorkerId> {
    (1..=count)
        .map(|n| WorkerId::new(format!("tcp://10.0.0.{n}:2375")))
        .collect()
}
