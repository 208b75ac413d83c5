//! # 求解器输入文件渲染
//!
//! 将拓扑、耦合常数、坐标和磁矩渲染为空白分隔的纯文本输入文件。
//! 每个文件首行（或前两行）为计数，随后每行一条记录。
//!
//! ## 文件列表
//! - `neighbors.dat`: K、截断宽度、每原子一行截断近邻表
//! - `jij_assign.dat`: K、截断宽度、每原子一行壳层分配表
//! - `jvalues.dat`: K、各壳层 J
//! - `positions.dat`: 原子数、笛卡尔坐标
//! - `moments.dat`: 不同磁矩个数、各磁矩
//! - `am_assign.dat`: 原子数、每原子 `磁矩编号 各向异性编号`
//! - `aniso_axes.dat`: 原子数、各向异性轴
//! - `aniso_energies.dat`: 各向异性能
//! - `config.dat`: 运行参数
//!
//! `neighbors.dat` 最后写入；只有全部文件都已存在时才跳过输出目录。
//!
//! ## 依赖关系
//! - 被 `commands/generate.rs` 调用
//! - 使用 `topology/` 的 `Topology`、`neighbors/` 的 `SpinStructure`

use super::config::SolverConfig;
use crate::error::{CinolaError, Result};
use crate::models::CouplingMap;
use crate::neighbors::SpinStructure;
use crate::topology::Topology;

use std::fs;
use std::path::{Path, PathBuf};

pub const NEIGHBORS_FILE: &str = "neighbors.dat";
pub const JIJ_ASSIGN_FILE: &str = "jij_assign.dat";
pub const JVALUES_FILE: &str = "jvalues.dat";
pub const POSITIONS_FILE: &str = "positions.dat";
pub const MOMENTS_FILE: &str = "moments.dat";
pub const AM_ASSIGN_FILE: &str = "am_assign.dat";
pub const ANISO_AXES_FILE: &str = "aniso_axes.dat";
pub const ANISO_ENERGIES_FILE: &str = "aniso_energies.dat";
pub const CONFIG_FILE: &str = "config.dat";

/// 写入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    /// 写入的文件
    Written(Vec<PathBuf>),
    /// 输出已存在且未要求覆盖
    Skipped,
}

/// 浮点数输出，整数值保留 `.0`
pub fn format_float(x: f64) -> String {
    let s = x.to_string();
    if x.is_finite() && !s.contains('.') {
        format!("{}.0", s)
    } else {
        s
    }
}

fn join_row<T: ToString>(row: &[T]) -> String {
    row.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 两行计数头 + 每原子一行
fn render_table(num_shells: usize, width: usize, rows: &[Vec<usize>]) -> String {
    let body = rows.iter().map(|r| join_row(r)).collect::<Vec<_>>().join("\n");
    format!("{}\n{}\n{}\n", num_shells, width, body)
}

/// 截断近邻表
pub fn render_neighbors(topology: &Topology) -> String {
    render_table(topology.num_shells(), topology.width(), &topology.neighbors)
}

/// 壳层分配表
pub fn render_jij_assign(topology: &Topology) -> String {
    render_table(topology.num_shells(), topology.width(), &topology.assignments)
}

/// 交换耦合常数
pub fn render_jvalues(couplings: &CouplingMap) -> String {
    let body = couplings
        .values()
        .iter()
        .map(|j| format!("{:.6}", j))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n{}\n", couplings.len(), body)
}

/// 笛卡尔坐标
pub fn render_positions(positions: &[[f64; 3]]) -> String {
    let body = positions
        .iter()
        .map(|p| {
            p.iter()
                .map(|&x| format_float(x))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n{}\n", positions.len(), body)
}

/// 按首次出现顺序去重的磁矩
pub fn unique_moments(moments: &[f64]) -> Vec<f64> {
    let mut unique: Vec<f64> = Vec::new();
    for &m in moments {
        if !unique.contains(&m) {
            unique.push(m);
        }
    }
    unique
}

/// 不同磁矩列表
pub fn render_moments(moments: &[f64]) -> String {
    let unique = unique_moments(moments);
    let body = unique
        .iter()
        .map(|&m| format_float(m))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n{}\n", unique.len(), body)
}

/// 每原子的磁矩编号（1-based）和各向异性编号（恒为 1）
pub fn render_am_assign(moments: &[f64]) -> String {
    let unique = unique_moments(moments);
    let body = moments
        .iter()
        .map(|m| {
            let idx = unique.iter().position(|u| u == m).unwrap_or(0);
            format!("{} 1", idx + 1)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n{}\n", moments.len(), body)
}

/// 各向异性轴，统一沿 z
pub fn render_aniso_axes(num_atoms: usize) -> String {
    let body = vec!["0.0 0.0 1.0"; num_atoms].join("\n");
    format!("{}\n{}\n", num_atoms, body)
}

/// 单一的零各向异性能
pub fn render_aniso_energies() -> String {
    "1\n0.0\n".to_string()
}

/// 运行参数
pub fn render_config(config: &SolverConfig) -> String {
    let [dx, dy, dz] = config.field_direction;
    let entries = [
        ("job_name", config.job_name.clone()),
        ("max_spin_change", format_float(config.max_spin_change)),
        ("num_steps_in_time", config.steps_per_temperature.to_string()),
        ("num_prerelax_steps", config.prerelax_steps.to_string()),
        ("T_low", format_float(config.t_low)),
        ("T_high", format_float(config.t_high)),
        ("T_step", format_float(config.t_step)),
        ("H_low", format!("{:.6}", config.field)),
        ("H_high", format!("{:.6}", config.field)),
        ("H_step", format!("{:.6}", config.field_step)),
        ("H_dir_x", format_float(dx)),
        ("H_dir_y", format_float(dy)),
        ("H_dir_z", format_float(dz)),
    ];

    entries
        .iter()
        .map(|(key, value)| format!("{} {}\n", key, value))
        .collect()
}

/// 全部输入文件的 (文件名, 内容)，`neighbors.dat` 排在最后
pub fn render_input_set<S>(
    structure: &S,
    topology: &Topology,
    couplings: &CouplingMap,
    config: &SolverConfig,
) -> Vec<(&'static str, String)>
where
    S: SpinStructure + ?Sized,
{
    let moments = structure.moments();

    vec![
        (JIJ_ASSIGN_FILE, render_jij_assign(topology)),
        (JVALUES_FILE, render_jvalues(couplings)),
        (POSITIONS_FILE, render_positions(&structure.positions())),
        (MOMENTS_FILE, render_moments(&moments)),
        (AM_ASSIGN_FILE, render_am_assign(&moments)),
        (ANISO_AXES_FILE, render_aniso_axes(moments.len())),
        (ANISO_ENERGIES_FILE, render_aniso_energies()),
        (CONFIG_FILE, render_config(config)),
        (NEIGHBORS_FILE, render_neighbors(topology)),
    ]
}

/// 将输入文件写入 `output_dir`
pub fn write_input_set<S>(
    output_dir: &Path,
    structure: &S,
    topology: &Topology,
    couplings: &CouplingMap,
    config: &SolverConfig,
    overwrite: bool,
) -> Result<WriteStatus>
where
    S: SpinStructure + ?Sized,
{
    let files = render_input_set(structure, topology, couplings, config);
    if !overwrite && files.iter().all(|(name, _)| output_dir.join(name).exists()) {
        return Ok(WriteStatus::Skipped);
    }

    fs::create_dir_all(output_dir).map_err(|e| CinolaError::FileWriteError {
        path: output_dir.display().to_string(),
        source: e,
    })?;

    let mut written = Vec::new();
    for (name, content) in files {
        let path = output_dir.join(name);
        fs::write(&path, content).map_err(|e| CinolaError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })?;
        written.push(path);
    }

    Ok(WriteStatus::Written(written))
}
