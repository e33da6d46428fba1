use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

use sandworm_api::create_app;
use sandworm_config::AppConfig;
use sandworm_dispatcher::{Dispatcher, DispatcherHandle};
use sandworm_domain::{RemoteLoggerFactory, RuntimeConnector, WorkerId};
use sandworm_worker::{DockerConnector, HttpRemoteLoggerFactory};

/// 应用程序：调度器及其 HTTP 入口，按配置组装
pub struct Application {
    config: AppConfig,
    dispatcher: DispatcherHandle,
}

impl Application {
    /// 组装 Docker 与 HTTP 适配器，必须在 tokio 运行时内调用
    pub fn new(config: AppConfig) -> Self {
        let connector = Arc::new(DockerConnector::new(&config.runtime));
        let logger_factory = Arc::new(HttpRemoteLoggerFactory::from_config(&config.logging));
        Self::with_components(config, connector, logger_factory)
    }

    pub fn with_components(
        config: AppConfig,
        connector: Arc<dyn RuntimeConnector>,
        logger_factory: Arc<dyn RemoteLoggerFactory>,
    ) -> Self {
        let workers: Vec<WorkerId> = config
            .dispatcher
            .workers
            .iter()
            .map(|w| WorkerId::new(w.trim()))
            .collect();
        info!(
            workers = ?workers.iter().map(WorkerId::as_str).collect::<Vec<_>>(),
            "已配置工作节点池"
        );

        let dispatcher = Dispatcher::spawn(
            workers,
            connector,
            logger_factory,
            config.dispatcher.command_buffer,
        );

        Self { config, dispatcher }
    }

    pub fn dispatcher(&self) -> &DispatcherHandle {
        &self.dispatcher
    }

    /// 运行直到收到关闭信号，然后停止调度器
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        if self.config.api.enabled {
            self.run_api(shutdown_rx).await?;
        } else {
            info!("API 已禁用，仅运行调度器");
            let _ = shutdown_rx.recv().await;
        }

        if let Err(e) = self.dispatcher.shutdown().await {
            warn!(error = %e, "调度器已经停止");
        }
        Ok(())
    }

    async fn run_api(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let bind_address = &self.config.api.bind_address;
        let listener = TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {bind_address}"))?;
        info!("API 服务器监听 http://{}", listener.local_addr()?);

        let app = create_app(self.dispatcher.clone());
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API 服务器收到关闭信号");
            })
            .await
            .context("API 服务器运行失败")?;

        info!("API 服务器已停止");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sandworm_testing_utils::{RecordingLoggerFactory, ScriptedConnector, TestEnv};

    use crate::shutdown::ShutdownManager;

    fn config(api_enabled: bool) -> AppConfig {
        let mut config = AppConfig::default();
        config.dispatcher.workers = vec![
            "tcp://10.0.0.1:2375".to_string(),
            " tcp://10.0.0.2:2375 ".to_string(),
        ];
        config.api.enabled = api_enabled;
        config.api.bind_address = "127.0.0.1:0".to_string();
        config
    }

    fn application(api_enabled: bool) -> Application {
        Application::with_components(
            config(api_enabled),
            Arc::new(ScriptedConnector::new()),
            Arc::new(RecordingLoggerFactory::new()),
        )
    }

    #[tokio::test]
    async fn test_configured_workers_start_idle() {
        let app = application(false);
        let snapshot = app.dispatcher().snapshot().await.unwrap();
        assert_eq!(
            snapshot.idle,
            vec![
                WorkerId::from("tcp://10.0.0.1:2375"),
                WorkerId::from("tcp://10.0.0.2:2375")
            ]
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_dispatcher() {
        for api_enabled in [false, true] {
            let app = Arc::new(application(api_enabled));
            let shutdown = ShutdownManager::new();
            let rx = shutdown.subscribe().await;

            let running = {
                let app = Arc::clone(&app);
                tokio::spawn(async move { app.run(rx).await })
            };

            shutdown.shutdown().await;
            let result = tokio::time::timeout(Duration::from_secs(5), running)
                .await
                .unwrap()
                .unwrap();
            assert!(result.is_ok());

            let dispatcher = app.dispatcher().clone();
            assert!(
                TestEnv::wait_for(
                    move || {
                        let dispatcher = dispatcher.clone();
                        async move { !dispatcher.is_running() }
                    },
                    Duration::from_secs(5)
                )
                .await
            );
        }
    }
}
