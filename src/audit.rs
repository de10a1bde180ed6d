//! 审计日志模块 - 追加写入的 CSV 变更记录

use anyhow::{Context, Result};
use chrono::Local;
use std::collections::BTreeSet;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// CSV 表头字段
const FIELD_NAMES: [&str; 5] = [
    "timestamp",
    "operation",
    "source_folder",
    "replica_folder",
    "changed_dirs",
];

/// 审计操作类型
///
/// COPY 目前不会由同步周期产生，保留用于前向兼容。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOp {
    Create,
    Copy,
    Delete,
}

impl AuditOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOp::Create => "CREATE",
            AuditOp::Copy => "COPY",
            AuditOp::Delete => "DELETE",
        }
    }
}

impl fmt::Display for AuditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 审计日志记录器
///
/// 一个实例对应一个追加写入的记录文件，不去重、不轮转、不限制大小。
pub struct AuditLogger {
    path: PathBuf,
}

impl AuditLogger {
    /// 创建记录器，目标文件不存在时写入表头
    ///
    /// 已存在的文件保持原样，不会写入第二行表头。
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("创建日志目录失败: {}", parent.display()))?;
                }
            }
            fs::write(&path, format!("{}\n", FIELD_NAMES.join(",")))
                .with_context(|| format!("写入日志表头失败: {}", path.display()))?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条记录并回显到控制台
    pub fn log(
        &self,
        operation: AuditOp,
        source: &Path,
        replica: &Path,
        changed: &BTreeSet<String>,
    ) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let source = display_relative(source);
        let replica = display_relative(replica);
        let changed = render_set(changed);

        info!(
            "审计: {} {} {} {} {}",
            timestamp, operation, source, replica, changed
        );

        let row = [
            timestamp.as_str(),
            operation.as_str(),
            source.as_str(),
            replica.as_str(),
            changed.as_str(),
        ]
        .map(csv_field)
        .join(",");

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("打开日志文件失败: {}", self.path.display()))?;
        writeln!(file, "{}", row)
            .with_context(|| format!("追加日志记录失败: {}", self.path.display()))?;

        Ok(())
    }

    pub fn create_log(&self, source: &Path, replica: &Path, changed: &BTreeSet<String>) -> Result<()> {
        self.log(AuditOp::Create, source, replica, changed)
    }

    pub fn copy_log(&self, source: &Path, replica: &Path, changed: &BTreeSet<String>) -> Result<()> {
        self.log(AuditOp::Copy, source, replica, changed)
    }

    pub fn delete_log(&self, source: &Path, replica: &Path, changed: &BTreeSet<String>) -> Result<()> {
        self.log(AuditOp::Delete, source, replica, changed)
    }
}

/// 将路径渲染为相对当前工作目录的形式
///
/// 工作目录之外的路径按原样输出。
fn display_relative(path: &Path) -> String {
    let relative = std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok().map(Path::to_path_buf));

    match relative {
        Some(p) if p.as_os_str().is_empty() => ".".to_string(),
        Some(p) => p.to_string_lossy().replace('\\', "/"),
        None => path.to_string_lossy().replace('\\', "/"),
    }
}

/// 将变更集合渲染为文本，例如 `{'a.txt', 'sub/b.txt'}`
///
/// 集合本身有序，输出按字典序确定。
fn render_set(changed: &BTreeSet<String>) -> String {
    let items = changed
        .iter()
        .map(|path| format!("'{}'", path))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", items)
}

/// 按需为 CSV 字段加引号
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
