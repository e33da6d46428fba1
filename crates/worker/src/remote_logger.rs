use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use sandworm_config::LoggingConfig;
use sandworm_domain::{RemoteLogger, RemoteLoggerFactory};

#[derive(Debug, Serialize)]
struct LogLine {
    tag: String,
    message: String,
}

/// HTTP远程日志记录器，把每行日志以JSON形式发送到任务的日志端点
///
/// 所有日志行经由同一个队列，由单个投递任务依次发送，因此端点收到的顺序与记录顺序一致。
/// 投递失败只记录调试日志。
pub struct HttpRemoteLogger {
    endpoint: String,
    lines: mpsc::UnboundedSender<LogLine>,
}

impl HttpRemoteLogger {
    /// 在当前运行时上启动投递任务；不在运行时内时记录器不生效，日志行被丢弃
    pub fn start(client: reqwest::Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        let endpoint = endpoint.into();
        let (lines, rx) = mpsc::unbounded_channel();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(deliver(client, endpoint.clone(), timeout, rx));
            }
            Err(_) => debug!(endpoint = %endpoint, "没有可用的运行时，远程日志已禁用"),
        }

        Self { endpoint, lines }
    }
}

async fn deliver(
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    mut rx: mpsc::UnboundedReceiver<LogLine>,
) {
    while let Some(line) = rx.recv().await {
        let result = client
            .post(&endpoint)
            .timeout(timeout)
            .json(&line)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        if let Err(e) = result {
            debug!(endpoint = %endpoint, tag = %line.tag, error = %e, "远程日志投递失败");
        }
    }
}

impl RemoteLogger for HttpRemoteLogger {
    fn log(&self, tag: &str, message: &str) {
        let line = LogLine {
            tag: tag.to_string(),
            message: message.to_string(),
        };
        if self.lines.send(line).is_err() {
            debug!(endpoint = %self.endpoint, tag, "投递任务已结束，丢弃远程日志");
        }
    }
}

/// 远程日志记录器工厂，所有记录器共享同一个HTTP连接池
#[derive(Clone)]
pub struct HttpRemoteLoggerFactory {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpRemoteLoggerFactory {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::new(Duration::from_secs(config.remote_timeout_seconds))
    }
}

impl RemoteLoggerFactory for HttpRemoteLoggerFactory {
    fn open(&self, logging_endpoint: &str) -> Arc<dyn RemoteLogger> {
        Arc::new(HttpRemoteLogger::start(
            self.client.clone(),
            logging_endpoint,
            self.timeout,
        ))
    }
}
