use std::collections::{BTreeSet, HashSet};

/// 两个快照之间的差异
///
/// 使用有序集合保存结果，保证下游的日志渲染是确定性的。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDiff {
    /// 仅存在于副本中的条目（待删除）
    pub extra_in_replica: BTreeSet<String>,
    /// 仅存在于源中的条目（仅用于决定是否记录 CREATE）
    pub new_in_source: BTreeSet<String>,
}

impl TreeDiff {
    /// 两棵树的路径集合完全一致
    pub fn is_clean(&self) -> bool {
        self.extra_in_replica.is_empty() && self.new_in_source.is_empty()
    }

    /// 统计差异
    pub fn summarize(&self, source_len: usize) -> DiffSummary {
        DiffSummary {
            new_count: self.new_in_source.len(),
            extra_count: self.extra_in_replica.len(),
            unchanged_count: source_len - self.new_in_source.len(),
        }
    }
}

/// 差异统计
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    pub new_count: usize,
    pub extra_count: usize,
    pub unchanged_count: usize,
}

/// 比较源快照与副本快照
///
/// `extra_in_replica = replica − source`，`new_in_source = source − replica`。
/// 实际的复制是无条件全量的，不限于 `new_in_source`。
pub fn diff_trees(source: &HashSet<String>, replica: &HashSet<String>) -> TreeDiff {
    let extra_in_replica = replica
        .iter()
        .filter(|path| !source.contains(*path))
        .cloned()
        .collect();

    let new_in_source = source
        .iter()
        .filter(|path| !replica.contains(*path))
        .cloned()
        .collect();

    TreeDiff {
        extra_in_replica,
        new_in_source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_classifies_entries() {
        let source = set(&["a.txt", "sub", "sub/b.txt"]);
        let replica = set(&["a.txt", "old.txt", "sub"]);

        let diff = diff_trees(&source, &replica);

        assert_eq!(
            diff.new_in_source.iter().collect::<Vec<_>>(),
            vec!["sub/b.txt"]
        );
        assert_eq!(
            diff.extra_in_replica.iter().collect::<Vec<_>>(),
            vec!["old.txt"]
        );
        assert!(!diff.is_clean());

        let summary = diff.summarize(source.len());
        assert_eq!(summary.new_count, 1);
        assert_eq!(summary.extra_count, 1);
        assert_eq!(summary.unchanged_count, 2);
    }

    #[test]
    fn test_identical_trees_are_clean() {
        let source = set(&["a.txt", "sub"]);

        let diff = diff_trees(&source, &source.clone());

        assert!(diff.is_clean());
    }

    #[test]
    fn test_diff_order_is_lexicographic() {
        let source = set(&[]);
        let replica = set(&["z.txt", "a.txt", "m/x.txt"]);

        let diff = diff_trees(&source, &replica);

        assert_eq!(
            diff.extra_in_replica.iter().collect::<Vec<_>>(),
            vec!["a.txt", "m/x.txt", "z.txt"]
        );
    }
}
