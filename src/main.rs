use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sandworm::{Application, ShutdownManager};
use sandworm_config::{AppConfig, ConfigValidator, LogFormat};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(
    name = "sandworm",
    version,
    about = "Dispatches container image runs onto a fixed pool of Docker endpoints"
)]
struct Cli {
    /// Configuration file; the default locations are searched when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    #[arg(
        short = 'l',
        long,
        value_name = "LEVEL",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    log_level: Option<String>,

    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Worker endpoint such as tcp://172.17.0.2:2375; repeat to replace the configured pool
    #[arg(short = 'w', long = "worker", value_name = "ENDPOINT")]
    workers: Vec<String>,

    /// API bind address
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut AppConfig) {
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if !self.workers.is_empty() {
            config.dispatcher.workers = self.workers;
        }
        if let Some(bind) = self.bind {
            config.api.bind_address = bind;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone();
    let mut config = AppConfig::load(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("加载配置文件失败: {path}"),
        None => "加载配置失败".to_string(),
    })?;
    cli.apply(&mut config);
    config.validate().context("配置验证失败")?;

    init_logging(&config.logging.level, config.logging.format)?;

    info!("启动 sandworm {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("配置文件: {path}");
    }

    let app = Arc::new(Application::new(config));
    let shutdown_manager = ShutdownManager::new();

    let mut app_handle = {
        let shutdown_rx = shutdown_manager.subscribe().await;
        let app = Arc::clone(&app);
        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    tokio::select! {
        _ = wait_for_shutdown_signal() => {}
        result = &mut app_handle => {
            shutdown_manager.shutdown().await;
            return match result {
                Ok(outcome) => outcome,
                Err(e) => Err(anyhow::anyhow!("应用任务异常退出: {e}")),
            };
        }
    }

    info!("开始关闭应用");
    shutdown_manager.shutdown().await;

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, app_handle).await {
        Ok(Ok(Ok(()))) => info!("应用已正常关闭"),
        Ok(Ok(Err(e))) => error!("应用运行失败: {e:#}"),
        Ok(Err(e)) => error!("应用任务异常退出: {e}"),
        Err(_) => warn!("关闭超时，强制退出"),
    }

    Ok(())
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: LogFormat) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("初始化JSON日志失败")?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .context("初始化日志失败")?,
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()
            .context("初始化紧凑日志失败")?,
    }

    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("监听 Ctrl+C 信号失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("监听 SIGTERM 信号失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("收到 Ctrl+C 信号"),
        _ = terminate => info!("收到 SIGTERM 信号"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "sandworm",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "-w",
            "tcp://10.0.0.1:2375",
            "--worker",
            "tcp://10.0.0.2:2375",
            "--bind",
            "127.0.0.1:9000",
        ]);
        let mut config = AppConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.dispatcher.workers,
            vec!["tcp://10.0.0.1:2375", "tcp://10.0.0.2:2375"]
        );
        assert_eq!(config.api.bind_address, "127.0.0.1:9000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_worker_flags_fill_an_empty_configured_pool() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"[dispatcher]\nworkers = []\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from(["sandworm", "--config", &path, "-w", "tcp://10.0.0.1:2375"]);
        let mut config = AppConfig::load(cli.config.as_deref()).unwrap();
        cli.apply(&mut config);

        assert_eq!(config.dispatcher.workers, vec!["tcp://10.0.0.1:2375"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::parse_from(["sandworm"]);
        let mut config = AppConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.dispatcher.workers.len(), 4);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        assert!(Cli::try_parse_from(["sandworm", "--log-level", "loud"]).is_err());
    }
}
