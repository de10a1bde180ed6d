use crate::core::scanner::{matches_pattern, ScanConfig, TreeScanner};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// 删除步骤的结果
///
/// 逐条目记录最终状态：删除尝试失败会被吞掉，但结果必须可观测。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// 删除后确认已不存在的条目
    pub removed: BTreeSet<String>,
    /// 两种删除尝试后仍然存在的条目
    pub failed: BTreeSet<String>,
}

/// 镜像执行器
///
/// 先全量覆盖复制源到副本，再尽力删除副本中的多余条目。
pub struct MirrorApplier {
    config: ScanConfig,
}

impl MirrorApplier {
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// 递归覆盖复制源目录到副本目录，返回复制的文件数
    ///
    /// 相同相对路径的文件被覆盖，缺失的目录被创建；
    /// 副本中不冲突的条目不受影响（纯复制，不做清理）。
    pub async fn copy_tree(&self, source: &Path, replica: &Path) -> Result<u32> {
        let source = source.to_path_buf();
        let replica = replica.to_path_buf();
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || Self::copy_tree_blocking(&source, &replica, &config))
            .await?
    }

    fn copy_tree_blocking(source: &Path, replica: &Path, config: &ScanConfig) -> Result<u32> {
        fs::create_dir_all(replica)
            .with_context(|| format!("创建副本目录失败: {}", replica.display()))?;

        let mut copied = 0u32;

        for entry in WalkDir::new(source).follow_links(false) {
            let entry = entry.with_context(|| format!("遍历源目录失败: {}", source.display()))?;

            let relative = match entry.path().strip_prefix(source) {
                Ok(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                // 跳过根目录本身
                _ => continue,
            };

            let relative_str = TreeScanner::normalize_path(&relative.to_string_lossy());
            if config
                .exclude_patterns
                .iter()
                .any(|pattern| matches_pattern(&relative_str, pattern))
            {
                continue;
            }

            let target = replica.join(&relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)
                    .with_context(|| format!("创建目录失败: {}", target.display()))?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("创建目录失败: {}", parent.display()))?;
                }
                fs::copy(entry.path(), &target).with_context(|| {
                    format!(
                        "复制文件失败: {} -> {}",
                        entry.path().display(),
                        target.display()
                    )
                })?;
                copied += 1;
            }
        }

        debug!(
            "复制完成: {} -> {}, {} 个文件",
            source.display(),
            replica.display(),
            copied
        );

        Ok(copied)
    }

    /// 尽力删除副本中的多余条目
    ///
    /// 每个条目先按目录树删除，仍存在时再按单个文件删除，
    /// 两次尝试的错误都不向上传播；最终以条目是否存在判定成败。
    pub async fn remove_extras(
        &self,
        replica: &Path,
        extras: &BTreeSet<String>,
    ) -> Result<DeleteReport> {
        let replica = replica.to_path_buf();
        let extras = extras.clone();

        Ok(
            tokio::task::spawn_blocking(move || Self::remove_extras_blocking(&replica, extras))
                .await?,
        )
    }

    fn remove_extras_blocking(replica: &Path, extras: BTreeSet<String>) -> DeleteReport {
        let mut report = DeleteReport::default();

        for relative in extras {
            let target = replica.join(&relative);

            // 条目可能已随父目录一并删除
            if target.exists() {
                let _ = fs::remove_dir_all(&target);
            }
            if target.exists() {
                let _ = fs::remove_file(&target);
            }

            if target.exists() {
                debug!("删除失败，条目仍然存在: {}", target.display());
                report.failed.insert(relative);
            } else {
                report.removed.insert(relative);
            }
        }

        report
    }
}

impl Default for MirrorApplier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_copy_overwrites_and_creates() {
        let source = tempfile::tempdir().unwrap();
        let replica = tempfile::tempdir().unwrap();
        fs::write(source.path().join("a.txt"), b"new").unwrap();
        fs::create_dir(source.path().join("sub")).unwrap();
        fs::write(source.path().join("sub").join("b.txt"), b"b").unwrap();
        fs::write(replica.path().join("a.txt"), b"old").unwrap();

        let copied = MirrorApplier::new()
            .copy_tree(source.path(), replica.path())
            .await
            .unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read(replica.path().join("a.txt")).unwrap(), b"new");
        assert_eq!(
            fs::read(replica.path().join("sub").join("b.txt")).unwrap(),
            b"b"
        );
    }

    #[tokio::test]
    async fn test_copy_leaves_unrelated_replica_entries() {
        let source = tempfile::tempdir().unwrap();
        let replica = tempfile::tempdir().unwrap();
        fs::write(source.path().join("a.txt"), b"a").unwrap();
        fs::write(replica.path().join("keep.txt"), b"keep").unwrap();

        MirrorApplier::new()
            .copy_tree(source.path(), replica.path())
            .await
            .unwrap();

        assert_eq!(fs::read(replica.path().join("keep.txt")).unwrap(), b"keep");
    }

    #[tokio::test]
    async fn test_copy_creates_missing_replica_root() {
        let source = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        let replica = base.path().join("replica");
        fs::write(source.path().join("a.txt"), b"a").unwrap();

        MirrorApplier::new()
            .copy_tree(source.path(), &replica)
            .await
            .unwrap();

        assert_eq!(fs::read(replica.join("a.txt")).unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_copy_from_missing_source_fails() {
        let base = tempfile::tempdir().unwrap();
        let replica = tempfile::tempdir().unwrap();

        let result = MirrorApplier::new()
            .copy_tree(&base.path().join("nope"), replica.path())
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_remove_extras_deletes_files_and_dirs() {
        let replica = tempfile::tempdir().unwrap();
        fs::write(replica.path().join("old.txt"), b"x").unwrap();
        fs::create_dir(replica.path().join("dead")).unwrap();
        fs::write(replica.path().join("dead").join("y.txt"), b"y").unwrap();

        let extras: BTreeSet<String> = ["old.txt", "dead", "dead/y.txt"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let report = MirrorApplier::new()
            .remove_extras(replica.path(), &extras)
            .await
            .unwrap();

        assert!(!replica.path().join("old.txt").exists());
        assert!(!replica.path().join("dead").exists());
        assert_eq!(report.removed, extras);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_remove_extras_counts_absent_entries_as_removed() {
        let replica = tempfile::tempdir().unwrap();

        let extras: BTreeSet<String> = ["ghost.txt"].iter().map(|s| s.to_string()).collect();

        let report = MirrorApplier::new()
            .remove_extras(replica.path(), &extras)
            .await
            .unwrap();

        assert!(report.removed.contains("ghost.txt"));
        assert!(report.failed.is_empty());
    }
}
