//! 应用配置模块

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 镜像配置
///
/// 持久化在 `config.json` 的 `mirror` 段中。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorConfig {
    /// 源目录（绝对路径）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// 副本目录（绝对路径）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica: Option<PathBuf>,
    /// 同步间隔（秒）
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// 审计日志文件路径
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<PathBuf>,
    /// 扫描排除规则
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_interval_secs() -> u64 {
    1
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            source: None,
            replica: None,
            interval_secs: default_interval_secs(),
            audit_log: None,
            exclude_patterns: Vec::new(),
        }
    }
}

impl MirrorConfig {
    /// 从配置文件加载镜像配置
    pub fn load(config_dir: &Path) -> Self {
        let config_file = config_dir.join("config.json");
        if config_file.exists() {
            if let Ok(content) = fs::read_to_string(&config_file) {
                if let Ok(config) = serde_json::from_str::<serde_json::Value>(&content) {
                    if let Some(mirror_config) = config.get("mirror") {
                        if let Ok(mirror) =
                            serde_json::from_value::<MirrorConfig>(mirror_config.clone())
                        {
                            return mirror;
                        }
                    }
                }
            }
        }
        Self::default()
    }

    /// 保存镜像配置
    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        let config_file = config_dir.join("config.json");

        // 读取现有配置
        let mut config: serde_json::Value = if config_file.exists() {
            let content = fs::read_to_string(&config_file)?;
            serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}))
        } else {
            serde_json::json!({})
        };

        // 更新镜像配置
        config["mirror"] = serde_json::to_value(self).unwrap();

        // 写入文件
        let content = serde_json::to_string_pretty(&config).unwrap();
        fs::write(&config_file, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();

        let config = MirrorConfig::load(dir.path());

        assert!(config.source.is_none());
        assert!(config.replica.is_none());
        assert_eq!(config.interval_secs, 1);
        assert!(config.audit_log.is_none());
        assert!(config.exclude_patterns.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = MirrorConfig {
            source: Some(PathBuf::from("/data/source")),
            replica: Some(PathBuf::from("/data/replica")),
            interval_secs: 30,
            audit_log: Some(PathBuf::from("/var/log/mirror.csv")),
            exclude_patterns: vec!["*.tmp".to_string()],
        };

        config.save(dir.path()).unwrap();
        let loaded = MirrorConfig::load(dir.path());

        assert_eq!(loaded.source, config.source);
        assert_eq!(loaded.replica, config.replica);
        assert_eq!(loaded.interval_secs, 30);
        assert_eq!(loaded.audit_log, config.audit_log);
        assert_eq!(loaded.exclude_patterns, config.exclude_patterns);
    }

    #[test]
    fn test_save_preserves_other_sections() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"log": {"enabled": false}}"#,
        )
        .unwrap();

        MirrorConfig::default().save(dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join("config.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["log"]["enabled"], serde_json::json!(false));
        assert!(value.get("mirror").is_some());
    }
}
