//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `generate`: 生成求解器输入集
//! - `shells`: 列出近邻壳层
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: generate, shells

pub mod generate;
pub mod shells;

use clap::{Parser, Subcommand};

/// cinolagen - 经典自旋蒙特卡洛输入生成器
#[derive(Parser)]
#[command(name = "cinolagen")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(
    about = "Generate neighbor topology input files for classical spin Monte Carlo",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Generate solver input files from structure files
    Generate(generate::GenerateArgs),

    /// List neighbor shells of a structure
    Shells(shells::ShellsArgs),
}
