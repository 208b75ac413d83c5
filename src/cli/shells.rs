//! # shells 子命令 CLI 定义
//!
//! 列出结构的近邻壳层，帮助选择交换耦合的壳层数。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/shells.rs`

use clap::Args;
use std::path::PathBuf;

/// shells 子命令参数
#[derive(Args, Debug)]
pub struct ShellsArgs {
    /// Structure file (POSCAR/CONTCAR/.cell)
    pub input: PathBuf,

    /// Number of nearest-neighbor candidates searched per atom
    #[arg(long, default_value_t = 100)]
    pub max_candidates: usize,

    /// Distance tolerance for grouping neighbors into one shell (Å)
    #[arg(long, default_value_t = 0.01)]
    pub shell_tolerance: f64,

    /// Number of shells to list
    #[arg(short = 'n', long, default_value_t = 6)]
    pub shells: usize,
}
