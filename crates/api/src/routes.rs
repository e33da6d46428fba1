use axum::{
    routing::{get, post},
    Router,
};

use sandworm_dispatcher::DispatcherHandle;

use crate::handlers::{
    executions::submit_execution,
    health::health_check,
    status::dispatcher_status,
};

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    /// 调度器句柄
    pub dispatcher: DispatcherHandle,
}

/// 创建路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 提交执行请求
        .route("/", post(submit_execution))
        // 健康检查与状态
        .route("/health", get(health_check))
        .route("/api/status", get(dispatcher_status))
        .with_state(state)
}
