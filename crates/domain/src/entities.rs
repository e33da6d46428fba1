use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 执行记录：一次提交的运行请求
///
/// 提交后不可变；调度器只把它交给一个生命周期，之后不再读取。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// 日志关联ID，不参与调度
    pub id: Uuid,
    /// 镜像仓库地址
    pub registry_url: String,
    /// 镜像名称
    pub image: String,
    /// 远程日志端点，同时作为容器唯一的命令参数
    pub logging_endpoint: String,
    /// 提交时间
    pub submitted_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn new(
        registry_url: impl Into<String>,
        image: impl Into<String>,
        logging_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            registry_url: registry_url.into(),
            image: image.into(),
            logging_endpoint: logging_endpoint.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// 拉取镜像时运行时端点上报的进度事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullProgress {
    pub status: String,
    pub detail: Option<String>,
}

impl PullProgress {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn message(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{} {}", self.status, detail),
            None => self.status.clone(),
        }
    }
}

/// 等待容器退出时上报的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitStatus {
    pub status_code: i64,
    pub error: Option<String>,
}

impl WaitStatus {
    pub fn exited(status_code: i64) -> Self {
        Self {
            status_code,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 0 && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_record_ids_are_unique() {
        let a = ExecutionRecord::new("registry.local:5000", "app:1", "http://logs/a");
        let b = ExecutionRecord::new("registry.local:5000", "app:1", "http://logs/a");
        assert_ne!(a.id, b.id);
        assert_eq!(a.image, b.image);
    }

    #[test]
    fn test_execution_record_serialization() {
        let record = ExecutionRecord::new("r", "i", "l");
        let json = serde_json::to_string(&record).unwrap();
        let back: ExecutionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn test_pull_progress_message() {
        assert_eq!(PullProgress::new("Pulling fs layer").message(), "Pulling fs layer");
        assert_eq!(
            PullProgress::new("Downloading").with_detail("[==>   ]").message(),
            "Downloading [==>   ]"
        );
    }

    #[test]
    fn test_wait_status_success() {
        assert!(WaitStatus::exited(0).is_success());
        assert!(!WaitStatus::exited(137).is_success());
        let status = WaitStatus {
            status_code: 0,
            error: Some("oom".to_string()),
        };
        assert!(!status.is_success());
    }
}
