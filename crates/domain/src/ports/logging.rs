use std::sync::Arc;

/// Per-job log sink. Delivery is best effort and never reported back.
pub trait RemoteLogger: Send + Sync {
    fn log(&self, tag: &str, message: &str);
}

pub trait RemoteLoggerFactory: Send + Sync {
    fn open(&self, logging_endpoint: &str) -> Arc<dyn RemoteLogger>;
}
