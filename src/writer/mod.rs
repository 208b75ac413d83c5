//! # 求解器输入写出模块
//!
//! 将定宽拓扑和运行参数写成求解器读取的纯文本输入集。
//!
//! ## 依赖关系
//! - 被 `commands/generate.rs` 调用
//! - 子模块: cinola, config

pub mod cinola;
pub mod config;

pub use cinola::{write_input_set, WriteStatus};
pub use config::SolverConfig;
