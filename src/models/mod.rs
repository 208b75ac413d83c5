//! # 数据模型模块
//!
//! 定义晶体结构、交换耦合常数和近邻表的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`neighbors/`、`topology/` 和 `commands/` 使用
//! - 子模块: structure, couplings, neighbors

pub mod couplings;
pub mod neighbors;
pub mod structure;

pub use couplings::CouplingMap;
pub use neighbors::{NeighborEntry, NeighborTable, ShellMatrix};
pub use structure::{Atom, Crystal, Lattice};
