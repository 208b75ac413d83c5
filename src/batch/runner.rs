//! # 批量执行器
//!
//! 并行执行批量处理任务，按输入顺序返回每个文件的处理记录。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代
//! - 进度条显示
//! - 按状态分类汇总
//!
//! ## 依赖关系
//! - 被 `commands/generate.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{CinolaError, Result};
use crate::utils::progress;

use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// 单个文件的处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    /// 处理成功
    Success,
    /// 跳过（输出已存在）
    Skipped,
    /// 结构不满足拓扑约束
    Rejected,
    /// 处理失败（读写或解析错误）
    Failed,
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Success => write!(f, "success"),
            ProcessStatus::Skipped => write!(f, "skipped"),
            ProcessStatus::Rejected => write!(f, "rejected"),
            ProcessStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 批量处理结果统计
#[derive(Debug)]
pub struct BatchResult<T> {
    pub success: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub failed: usize,
    /// 与输入文件顺序一致的处理记录
    pub records: Vec<T>,
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        BatchResult {
            success: 0,
            skipped: 0,
            rejected: 0,
            failed: 0,
            records: Vec::new(),
        }
    }
}

impl<T> BatchResult<T> {
    /// 合并处理结果
    pub fn merge(&mut self, status: ProcessStatus, record: T) {
        match status {
            ProcessStatus::Success => self.success += 1,
            ProcessStatus::Skipped => self.skipped += 1,
            ProcessStatus::Rejected => self.rejected += 1,
            ProcessStatus::Failed => self.failed += 1,
        }
        self.records.push(record);
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.rejected + self.failed
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理文件列表
    pub fn run<T, F>(&self, files: &[PathBuf], processor: F) -> Result<BatchResult<T>>
    where
        T: Send,
        F: Fn(&PathBuf) -> (ProcessStatus, T) + Sync + Send,
    {
        let pb = progress::create_progress_bar(files.len() as u64, "Processing");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| CinolaError::Other(format!("Failed to build thread pool: {}", e)))?;

        let results: Vec<(ProcessStatus, T)> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let result = processor(file);
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        for (status, record) in results {
            batch_result.merge(status, record);
        }

        Ok(batch_result)
    }
}
