use mirrorsync_lib::config::MirrorConfig;
use mirrorsync_lib::core::{MirrorScheduler, ScanConfig};
use mirrorsync_lib::logging::{log_dir, LogConfig, SizeRotatingWriter};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::prelude::*;

/// 初始化日志系统
fn init_logging() {
    let log_dir = log_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    let config = LogConfig::load(&log_dir);

    if !config.enabled {
        // 日志已禁用，只初始化一个空的 subscriber
        let subscriber = tracing_subscriber::registry();
        let _ = tracing::subscriber::set_global_default(subscriber);
        return;
    }

    let level = config.tracing_level();
    let env_filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if let Ok(file_writer) = SizeRotatingWriter::new(&log_dir, config.max_size_mb) {
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false);

        // 审计回显等面向用户的输出同时打到控制台
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(console_layer);

        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        // 文件日志创建失败，回退到控制台
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_logging();

    let config_dir = mirrorsync_lib::dirs::config_dir()
        .map(|p| p.join("mirrorsync"))
        .unwrap_or_else(|| PathBuf::from(".mirrorsync"));
    let config = MirrorConfig::load(&config_dir);

    let scheduler = MirrorScheduler::with_config(ScanConfig {
        exclude_patterns: config.exclude_patterns.clone(),
    });
    let handle = scheduler.handle();

    if let Some(source) = &config.source {
        handle.set_source(source);
    }
    if let Some(replica) = &config.replica {
        handle.set_replica(replica);
    }
    handle
        .set_interval(Duration::from_secs(config.interval_secs))
        .expect("invalid sync interval in config");
    if let Some(audit_log) = &config.audit_log {
        handle
            .set_audit_log(audit_log)
            .expect("failed to initialize audit log");
    }

    info!("镜像服务已启动");
    let task = tokio::spawn(scheduler.run());

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for shutdown signal");
    info!("收到退出信号，正在停止...");

    handle.shutdown();
    let _ = task.await;
}
