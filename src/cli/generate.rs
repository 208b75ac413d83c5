//! # generate 子命令 CLI 定义
//!
//! 由结构文件生成求解器输入集：单个结构文件或包含多个结构的目录。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/generate.rs`
//! - `--couplings` 直接解析为 `models::CouplingMap`

use crate::models::CouplingMap;

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 壳层近邻数的一致性要求
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ShellCounting {
    /// Every active shell must have the same neighbor count on every atom
    Uniform,
    /// Each shell must be uniform across atoms, counts may differ between shells
    PerShell,
}

impl std::fmt::Display for ShellCounting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShellCounting::Uniform => write!(f, "uniform"),
            ShellCounting::PerShell => write!(f, "per-shell"),
        }
    }
}

/// generate 子命令参数
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Structure file (POSCAR/CONTCAR/.cell) or a directory of structures
    pub input: PathBuf,

    /// Output directory (batch mode writes one subdirectory per structure)
    #[arg(short, long, default_value = "cinola_input")]
    pub output: PathBuf,

    /// Exchange couplings per shell, e.g. '1.0,-0.5' or '1=1.0,2=-0.5'
    #[arg(short = 'J', long, allow_hyphen_values = true)]
    pub couplings: CouplingMap,

    /// Initial magnetic moments in MAGMOM syntax, e.g. '2*2.2 -2.2'
    #[arg(short, long, allow_hyphen_values = true)]
    pub magmoms: Option<String>,

    /// Number of nearest-neighbor candidates searched per atom
    #[arg(long, default_value_t = 100)]
    pub max_candidates: usize,

    /// Distance tolerance for grouping neighbors into one shell (Å)
    #[arg(long, default_value_t = 0.01)]
    pub shell_tolerance: f64,

    /// Neighbor count consistency rule
    #[arg(long, value_enum, default_value_t = ShellCounting::Uniform)]
    pub counting: ShellCounting,

    /// Cross-check the truncated table against the weighted shell matrices
    #[arg(long, default_value_t = false)]
    pub verify: bool,

    /// Job name written to config.dat (defaults to the structure name)
    #[arg(long)]
    pub job_name: Option<String>,

    /// Lowest temperature (K)
    #[arg(long, default_value_t = 1.0)]
    pub temp_low: f64,

    /// Highest temperature (K)
    #[arg(long, default_value_t = 1000.0)]
    pub temp_high: f64,

    /// Temperature step (K)
    #[arg(long, default_value_t = 10.0)]
    pub temp_step: f64,

    /// Monte Carlo steps per temperature
    #[arg(long, default_value_t = 10000)]
    pub steps: u64,

    /// Pre-relaxation steps
    #[arg(long, default_value_t = 1)]
    pub prerelax_steps: u64,

    /// Maximum spin change per step
    #[arg(long, default_value_t = 0.5)]
    pub max_spin_change: f64,

    /// External magnetic field along x
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub field: f64,

    /// Glob patterns for structure files in batch mode (comma separated)
    #[arg(short, long, default_value = "POSCAR*,CONTCAR*,*.vasp,*.cell")]
    pub pattern: String,

    /// Recurse into subdirectories
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0, env = "CINOLAGEN_JOBS")]
    pub jobs: usize,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
