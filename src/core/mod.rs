pub mod comparator;
pub mod mirror;
pub mod scanner;
pub mod scheduler;

pub use comparator::{diff_trees, DiffSummary, TreeDiff};
pub use mirror::{DeleteReport, MirrorApplier};
pub use scanner::{ScanConfig, TreeScanner};
pub use scheduler::{CycleReport, MirrorScheduler};
