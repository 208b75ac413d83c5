//! # 统一错误处理模块
//!
//! 定义 cinolagen 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// cinolagen 统一错误类型
#[derive(Error, Debug)]
pub enum CinolaError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid coupling constants: {0}")]
    InvalidCouplings(String),

    #[error("Invalid magnetic moments: {0}")]
    InvalidMagmoms(String),

    // ─────────────────────────────────────────────────────────────
    // 拓扑错误
    // ─────────────────────────────────────────────────────────────
    #[error(
        "Structural inconsistency: neighbor counts per active shell are not uniform \
         (observed counts: {counts:?})"
    )]
    StructuralInconsistency { counts: Vec<usize> },

    #[error(
        "Shell ordering violation: atom {atom} has an active-shell neighbor at slot {position}, \
         beyond the truncation width {width}"
    )]
    ShellOrderingViolation {
        atom: usize,
        position: usize,
        width: usize,
    },

    #[error(
        "Coupling mapping mismatch for atom {atom}: missing neighbors {missing:?}, \
         unexpected neighbors {unexpected:?}"
    )]
    CouplingMappingMismatch {
        atom: usize,
        missing: Vec<usize>,
        unexpected: Vec<usize>,
    },

    #[error(
        "Only {complete} shell(s) are complete within {max_candidates} candidates, \
         but {requested} coupling(s) were given (raise --max-candidates)"
    )]
    IncompleteShells {
        requested: usize,
        complete: usize,
        max_candidates: usize,
    },

    #[error("Neighbor search failed: {0}")]
    NeighborSearch(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl CinolaError {
    /// 是否为拓扑校验失败（批量模式下跳过该结构即可）
    pub fn is_topology_error(&self) -> bool {
        matches!(
            self,
            CinolaError::StructuralInconsistency { .. }
                | CinolaError::ShellOrderingViolation { .. }
                | CinolaError::CouplingMappingMismatch { .. }
        )
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, CinolaError>;
