use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// 目录扫描配置
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// 排除规则（glob patterns）
    ///
    /// 镜像要求源与副本逐项一致，默认不排除任何条目。
    pub exclude_patterns: Vec<String>,
}

/// 目录树扫描器
///
/// 递归遍历一棵目录树，产出相对于根目录的路径集合。
/// 文件和目录共享同一个命名空间。
pub struct TreeScanner {
    config: ScanConfig,
}

impl TreeScanner {
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// 检查路径是否应该被排除
    fn should_exclude(&self, path: &str) -> bool {
        self.config
            .exclude_patterns
            .iter()
            .any(|pattern| matches_pattern(path, pattern))
    }

    /// 规范化路径分隔符（统一使用 /）
    pub(crate) fn normalize_path(path: &str) -> String {
        path.replace('\\', "/")
    }

    /// 扫描目录树，返回相对路径集合
    ///
    /// 根目录不存在时返回空集合，由后续的复制步骤决定是否报错。
    pub async fn snapshot(&self, root: &Path) -> Result<HashSet<String>> {
        let root = root.to_path_buf();
        let config = self.config.clone();

        // 使用 spawn_blocking 避免阻塞 async runtime
        tokio::task::spawn_blocking(move || Self::walk(&root, config)).await?
    }

    fn walk(root: &Path, config: ScanConfig) -> Result<HashSet<String>> {
        if !root.exists() {
            return Ok(HashSet::new());
        }

        let scanner = TreeScanner { config };
        let mut entries = HashSet::new();
        let mut excluded_count = 0;

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.with_context(|| format!("遍历目录失败: {}", root.display()))?;

            let relative = match entry.path().strip_prefix(root) {
                Ok(p) if !p.as_os_str().is_empty() => p,
                // 跳过根目录本身
                _ => continue,
            };

            let relative = Self::normalize_path(&relative.to_string_lossy());

            if scanner.should_exclude(&relative) {
                debug!("排除条目: {}", relative);
                excluded_count += 1;
                continue;
            }

            entries.insert(relative);
        }

        debug!(
            "扫描完成: {} 共 {} 个条目, {} 个被排除",
            root.display(),
            entries.len(),
            excluded_count
        );

        Ok(entries)
    }
}

impl Default for TreeScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// 简单的 glob 模式匹配
pub(crate) fn matches_pattern(path: &str, pattern: &str) -> bool {
    let path = path.to_lowercase();
    let pattern = pattern.to_lowercase();

    // 处理 ** 通配符
    if pattern.contains("**") {
        let parts: Vec<&str> = pattern.split("**").collect();
        if parts.len() == 2 {
            let prefix = parts[0].trim_end_matches('/');
            let suffix = parts[1].trim_start_matches('/');

            if prefix.is_empty() && suffix.is_empty() {
                return true;
            }

            if !prefix.is_empty() && !path.starts_with(prefix) {
                return false;
            }

            if !suffix.is_empty() && !path.ends_with(suffix) {
                return false;
            }

            return true;
        }
    }

    // 处理 * 通配符
    if pattern.contains('*') {
        let regex_pattern = pattern.replace('.', "\\.").replace('*', ".*");

        if let Ok(re) = regex::Regex::new(&format!("^{}$", regex_pattern)) {
            return re.is_match(&path);
        }
    }

    // 精确匹配
    path == pattern || path.ends_with(&format!("/{}", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_snapshot_lists_files_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.txt"), b"b").unwrap();

        let snapshot = TreeScanner::new().snapshot(dir.path()).await.unwrap();

        let expected: HashSet<String> = ["a.txt", "sub", "sub/b.txt"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(snapshot, expected);
    }

    #[tokio::test]
    async fn test_snapshot_of_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let snapshot = TreeScanner::new().snapshot(&missing).await.unwrap();

        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_exclude_patterns_filter_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.txt"), b"k").unwrap();
        fs::write(dir.path().join("drop.tmp"), b"d").unwrap();
        fs::create_dir(dir.path().join("cache")).unwrap();
        fs::write(dir.path().join("cache").join("x"), b"x").unwrap();

        let scanner = TreeScanner::with_config(ScanConfig {
            exclude_patterns: vec!["*.tmp".to_string(), "cache/**".to_string()],
        });
        let snapshot = scanner.snapshot(dir.path()).await.unwrap();

        assert!(snapshot.contains("keep.txt"));
        assert!(!snapshot.contains("drop.tmp"));
        assert!(!snapshot.contains("cache/x"));
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("a/b.tmp", "*.tmp"));
        assert!(matches_pattern("node_modules/x/y", "node_modules/**"));
        assert!(matches_pattern("sub/thumbs.db", "Thumbs.db"));
        assert!(!matches_pattern("a/b.txt", "*.tmp"));
    }
}
