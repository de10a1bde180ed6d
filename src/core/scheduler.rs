#![allow(non_snake_case)]

use crate::audit::AuditLogger;
use crate::control::{MirrorHandle, SharedState};
use crate::core::comparator::diff_trees;
use crate::core::mirror::MirrorApplier;
use crate::core::scanner::{ScanConfig, TreeScanner};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 单个同步周期的结果报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub startTime: i64,
    pub endTime: i64,
    pub entriesScanned: u32,
    pub filesCopied: u32,
    pub entriesCreated: u32,
    pub entriesDeleted: u32,
    pub deleteFailed: u32,
    pub duration: u64,
}

/// 镜像调度器
///
/// 后台循环：等待间隔 → 读取配置 → 扫描两棵树 → 比较 →
/// 复制 → 记录 CREATE → 删除多余条目 → 记录 DELETE。
/// 周期之间串行执行，慢周期只会推迟下一次等待。
pub struct MirrorScheduler {
    shared: Arc<SharedState>,
    scan_config: ScanConfig,
}

impl MirrorScheduler {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SharedState::new()),
            scan_config: ScanConfig::default(),
        }
    }

    pub fn with_config(scan_config: ScanConfig) -> Self {
        Self {
            shared: Arc::new(SharedState::new()),
            scan_config,
        }
    }

    /// 获取控制句柄
    pub fn handle(&self) -> MirrorHandle {
        MirrorHandle {
            shared: self.shared.clone(),
        }
    }

    /// 运行后台循环，直到收到停止信号
    pub async fn run(self) {
        info!("镜像调度器已启动");

        loop {
            if self.shared.stopped.load(Ordering::SeqCst) {
                break;
            }

            // 本次等待使用开始等待时生效的间隔值
            let interval = self.shared.settings.lock().unwrap().interval;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.shared.wake.notified() => {}
            }

            if self.shared.stopped.load(Ordering::SeqCst) {
                break;
            }

            // 每个周期重新读取一次配置
            let settings = self.shared.settings.lock().unwrap().clone();
            let (source, replica) = match (&settings.source, &settings.replica) {
                (Some(s), Some(r)) => (s.clone(), r.clone()),
                // 源或副本未配置时静默跳过本轮
                _ => continue,
            };

            match self
                .run_cycle(&source, &replica, settings.audit.as_deref())
                .await
            {
                Ok(report) => {
                    *self.shared.last_report.lock().unwrap() = Some(report);
                }
                // 周期级错误不终止循环，下个间隔重试
                Err(e) => error!("同步周期失败: {:#}", e),
            }
        }

        info!("镜像调度器已停止");
    }

    /// 执行一个完整的同步周期
    async fn run_cycle(
        &self,
        source: &Path,
        replica: &Path,
        audit: Option<&AuditLogger>,
    ) -> Result<CycleReport> {
        let start_time = chrono::Utc::now().timestamp();

        let scanner = TreeScanner::with_config(self.scan_config.clone());
        let source_set = scanner
            .snapshot(source)
            .await
            .context("扫描源目录失败")?;
        let replica_set = scanner
            .snapshot(replica)
            .await
            .context("扫描副本目录失败")?;

        // 多余条目基于复制前的副本快照计算
        let diff = diff_trees(&source_set, &replica_set);
        let summary = diff.summarize(source_set.len());
        debug!(
            "比较完成: 新增 {}, 多余 {}, 未变化 {}",
            summary.new_count, summary.extra_count, summary.unchanged_count
        );

        let applier = MirrorApplier::with_config(self.scan_config.clone());
        let copied = applier
            .copy_tree(source, replica)
            .await
            .context("复制源目录失败")?;

        if let Some(audit) = audit {
            if !diff.new_in_source.is_empty() {
                if let Err(e) = audit.create_log(source, replica, &diff.new_in_source) {
                    warn!("写入 CREATE 审计记录失败: {:#}", e);
                }
            }
        }

        let deletes = applier.remove_extras(replica, &diff.extra_in_replica).await?;
        if !deletes.failed.is_empty() {
            debug!("{} 个多余条目未能删除", deletes.failed.len());
        }

        if let Some(audit) = audit {
            if !deletes.removed.is_empty() {
                if let Err(e) = audit.delete_log(source, replica, &deletes.removed) {
                    warn!("写入 DELETE 审计记录失败: {:#}", e);
                }
            }
        }

        let end_time = chrono::Utc::now().timestamp();
        let report = CycleReport {
            startTime: start_time,
            endTime: end_time,
            entriesScanned: (source_set.len() + replica_set.len()) as u32,
            filesCopied: copied,
            entriesCreated: diff.new_in_source.len() as u32,
            entriesDeleted: deletes.removed.len() as u32,
            deleteFailed: deletes.failed.len() as u32,
            duration: (end_time - start_time) as u64,
        };

        debug!(
            "同步周期完成: 复制 {} 个文件, 删除 {} 个条目, {} 个删除失败",
            report.filesCopied, report.entriesDeleted, report.deleteFailed
        );

        Ok(report)
    }
}

impl Default for MirrorScheduler {
    fn default() -> Self {
        Self::new()
    }
}
