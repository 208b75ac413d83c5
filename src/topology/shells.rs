//! # 活跃壳层选择
//!
//! 活跃壳层恒为 {1, …, K}，K 为交换耦合常数的个数；近邻表中 K 以外的壳层一律忽略。
//!
//! ## 依赖关系
//! - 被 `topology/counter.rs` 和 `topology/builder.rs` 使用
//! - 使用 `models/couplings.rs`

use crate::models::CouplingMap;
use std::ops::RangeInclusive;

/// 活跃壳层集合 {1, …, K}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveShells {
    count: usize,
}

impl ActiveShells {
    pub fn new(count: usize) -> Self {
        ActiveShells { count }
    }

    /// 活跃壳层数 K
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn contains(&self, shell: usize) -> bool {
        (1..=self.count).contains(&shell)
    }

    /// 按升序遍历活跃壳层
    pub fn iter(&self) -> RangeInclusive<usize> {
        1..=self.count
    }
}

/// 由耦合常数确定活跃壳层
pub fn active_shells(couplings: &CouplingMap) -> ActiveShells {
    ActiveShells::new(couplings.len())
}
