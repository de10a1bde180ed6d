//! 控制接口 - 供外部交互层调用的配置读写入口
//!
//! 路径的校验、解析和创建确认由调用方负责，这里只存取配置。

use crate::audit::AuditLogger;
use crate::core::scheduler::CycleReport;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::info;

/// 控制接口错误
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("同步间隔必须大于零")]
    ZeroInterval,
    #[error("初始化审计日志失败: {0}")]
    AuditLog(String),
}

/// 调度器的可变配置
///
/// 每个同步周期开始时在锁内整体读取一次。
#[derive(Clone)]
pub(crate) struct MirrorSettings {
    pub source: Option<PathBuf>,
    pub replica: Option<PathBuf>,
    pub interval: Duration,
    pub audit: Option<Arc<AuditLogger>>,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            source: None,
            replica: None,
            interval: Duration::from_secs(1),
            audit: None,
        }
    }
}

/// 控制接口与调度器共享的状态
pub(crate) struct SharedState {
    pub settings: Mutex<MirrorSettings>,
    pub last_report: Mutex<Option<CycleReport>>,
    pub stopped: AtomicBool,
    pub wake: Notify,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            settings: Mutex::new(MirrorSettings::default()),
            last_report: Mutex::new(None),
            stopped: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }
}

/// 当前配置快照
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorStatus {
    pub source: Option<String>,
    pub replica: Option<String>,
    pub interval_secs: u64,
    pub audit_log: Option<String>,
    pub last_report: Option<CycleReport>,
}

/// 镜像服务的控制句柄
///
/// 可以廉价克隆并跨线程使用；所有写入都经过锁，
/// 调度器在下一个周期读到新值。
#[derive(Clone)]
pub struct MirrorHandle {
    pub(crate) shared: Arc<SharedState>,
}

impl MirrorHandle {
    /// 更新源目录（绝对路径）
    pub fn set_source(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        info!("更新源目录: {}", path.display());
        self.shared.settings.lock().unwrap().source = Some(path);
    }

    /// 更新副本目录（绝对路径）
    pub fn set_replica(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        info!("更新副本目录: {}", path.display());
        self.shared.settings.lock().unwrap().replica = Some(path);
    }

    /// 更新同步间隔
    pub fn set_interval(&self, interval: Duration) -> Result<(), ControlError> {
        if interval.is_zero() {
            return Err(ControlError::ZeroInterval);
        }
        info!("更新同步间隔: {:?}", interval);
        self.shared.settings.lock().unwrap().interval = interval;
        Ok(())
    }

    /// 设置审计日志文件，文件不存在时写入表头
    pub fn set_audit_log(&self, path: impl Into<PathBuf>) -> Result<(), ControlError> {
        let logger =
            AuditLogger::new(path).map_err(|e| ControlError::AuditLog(e.to_string()))?;
        info!("更新审计日志: {}", logger.path().display());
        self.shared.settings.lock().unwrap().audit = Some(Arc::new(logger));
        Ok(())
    }

    /// 停用审计日志
    pub fn clear_audit_log(&self) {
        self.shared.settings.lock().unwrap().audit = None;
    }

    /// 读取当前配置快照
    pub fn status(&self) -> MirrorStatus {
        let settings = self.shared.settings.lock().unwrap();
        MirrorStatus {
            source: settings
                .source
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            replica: settings
                .replica
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            interval_secs: settings.interval.as_secs(),
            audit_log: settings
                .audit
                .as_ref()
                .map(|l| l.path().to_string_lossy().into_owned()),
            last_report: self.shared.last_report.lock().unwrap().clone(),
        }
    }

    /// 停止调度器
    ///
    /// 停止信号在每次等待的开头被检查，正在执行的周期不会被打断。
    pub fn shutdown(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();
    }
}
