pub mod audit;
pub mod config;
pub mod control;
pub mod core;
pub mod logging;

pub use audit::{AuditLogger, AuditOp};
pub use config::MirrorConfig;
pub use control::{ControlError, MirrorHandle, MirrorStatus};
pub use core::{CycleReport, MirrorScheduler, ScanConfig};

/// 平台相关目录
pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            // Linux
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        }
    }
}
