//! # cinolagen - 经典自旋蒙特卡洛输入生成器
//!
//! 从晶体结构生成经典海森堡自旋蒙特卡洛求解器的输入文件：
//! 壳层截断的定宽近邻表、壳层分配表、交换耦合常数、坐标、磁矩与运行参数。
//!
//! ## 子命令
//! - `generate` - 生成输入文件（单个结构或批量目录）
//! - `shells`   - 列出近邻壳层，帮助选择壳层数
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (结构与磁矩解析)
//!   │     ├── neighbors/ (周期近邻搜索)
//!   │     ├── topology/  (壳层选择、近邻计数、截断表构建)
//!   │     ├── writer/    (输入文件写出)
//!   │     ├── batch/     (批量收集与并行执行)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (终端输出、进度条)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod models;
mod neighbors;
mod parsers;
mod topology;
mod utils;
mod writer;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
