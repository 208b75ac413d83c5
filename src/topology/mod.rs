//! # 拓扑模块
//!
//! 壳层截断的定宽近邻拓扑：活跃壳层选择、近邻计数与截断表构建。
//!
//! ## 子模块
//! - `shells`: 活跃壳层选择
//! - `counter`: 壳层近邻计数与截断宽度
//! - `builder`: 截断近邻表与壳层分配表
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `models/` 和 `neighbors/`

pub mod builder;
pub mod counter;
pub mod shells;

pub use builder::{Topology, TopologyBuilder};
pub use counter::{
    complete_shells, max_consistent_shells, neighbors_per_shell, shell_statistics, CountPolicy,
};
pub use shells::ActiveShells;
