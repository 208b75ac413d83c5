//! # 近邻来源模块
//!
//! 定义结构能力接口 `SpinStructure`，以及基于周期像暴力搜索的实现。
//!
//! ## 依赖关系
//! - 被 `topology/`、`writer/` 和 `commands/` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: search

pub mod search;

use crate::error::Result;
use crate::models::{NeighborTable, ShellMatrix};

pub use search::{PeriodicStructure, SearchSettings};

/// 自旋模型所需的结构能力
pub trait SpinStructure {
    /// 原子笛卡尔坐标 (Å)
    fn positions(&self) -> Vec<[f64; 3]>;

    /// 每个原子的初始磁矩
    fn moments(&self) -> Vec<f64>;

    /// 每个原子最多 `max_candidates` 个候选近邻，按距离升序并标注壳层
    fn neighbor_table(&self, max_candidates: usize) -> Result<NeighborTable>;

    /// 第 `shell` 壳层的邻接矩阵
    fn shell_adjacency(&self, table: &NeighborTable, shell: usize) -> ShellMatrix {
        table.shell_matrix(shell)
    }
}
