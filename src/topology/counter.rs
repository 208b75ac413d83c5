//! # 壳层近邻计数
//!
//! 校验每个原子在每个活跃壳层中的近邻数一致，并给出截断宽度。
//!
//! ## 计数规则
//! - `Uniform`（默认）：所有 (原子, 活跃壳层) 的近邻数必须是同一个值 M，
//!   截断宽度 = M × K
//! - `PerShell`：每个活跃壳层在所有原子上的近邻数一致即可，各壳层可以不同，
//!   截断宽度 = Σ M_s
//!
//! 原子列表中缺失的活跃壳层按 0 个近邻计，而不是只统计该原子实际出现的壳层。
//! 这是有意收紧的规则：某个活跃壳层只出现在部分原子上时，结构判为计数不一致。
//!
//! ## 依赖关系
//! - 被 `topology/builder.rs` 和 `commands/shells.rs` 使用
//! - 使用 `models/neighbors.rs`、`topology/shells.rs`

use super::shells::ActiveShells;
use crate::error::{CinolaError, Result};
use crate::models::{NeighborEntry, NeighborTable};

use std::collections::BTreeSet;

/// 近邻计数规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountPolicy {
    /// 所有活跃壳层共用一个近邻数 M
    #[default]
    Uniform,
    /// 每个活跃壳层各自一致
    PerShell,
}

/// 各活跃壳层的近邻数
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellCounts {
    /// 下标 i 对应壳层 i + 1
    counts: Vec<usize>,
}

impl ShellCounts {
    /// 活跃壳层数 K
    pub fn num_shells(&self) -> usize {
        self.counts.len()
    }

    /// 壳层 `shell` 的近邻数
    pub fn get(&self, shell: usize) -> Option<usize> {
        shell.checked_sub(1).and_then(|i| self.counts.get(i).copied())
    }

    /// 所有壳层近邻数相同时返回 M
    pub fn uniform(&self) -> Option<usize> {
        let first = *self.counts.first()?;
        self.counts.iter().all(|&c| c == first).then_some(first)
    }

    /// 截断宽度：每个原子保留的近邻槽位数
    pub fn truncation_width(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// 原子 `row` 在各活跃壳层中的近邻数（缺失壳层计 0）
fn atom_shell_counts(row: &[NeighborEntry], active: ActiveShells) -> Vec<usize> {
    let mut counts = vec![0; active.len()];
    for entry in row.iter().filter(|e| active.contains(e.shell)) {
        counts[entry.shell - 1] += 1;
    }
    counts
}

/// 按 `policy` 统计各活跃壳层的近邻数
pub fn count_shell_neighbors(
    table: &NeighborTable,
    active: ActiveShells,
    policy: CountPolicy,
) -> Result<ShellCounts> {
    if active.is_empty() {
        return Ok(ShellCounts::default());
    }

    let per_atom: Vec<Vec<usize>> = table
        .rows()
        .map(|row| atom_shell_counts(row, active))
        .collect();

    match policy {
        CountPolicy::Uniform => {
            let distinct: BTreeSet<usize> = per_atom.iter().flatten().copied().collect();
            match single_value(&distinct) {
                Some(m) => Ok(ShellCounts {
                    counts: vec![m; active.len()],
                }),
                None => Err(CinolaError::StructuralInconsistency {
                    counts: distinct.into_iter().collect(),
                }),
            }
        }
        CountPolicy::PerShell => {
            let mut counts = Vec::with_capacity(active.len());
            for shell in active.iter() {
                let distinct: BTreeSet<usize> =
                    per_atom.iter().map(|atom| atom[shell - 1]).collect();
                match single_value(&distinct) {
                    Some(m) => counts.push(m),
                    None => {
                        return Err(CinolaError::StructuralInconsistency {
                            counts: distinct.into_iter().collect(),
                        })
                    }
                }
            }
            Ok(ShellCounts { counts })
        }
    }
}

fn single_value(distinct: &BTreeSet<usize>) -> Option<usize> {
    match distinct.len() {
        1 => distinct.first().copied(),
        _ => None,
    }
}

/// 统一计数下的截断宽度 M × K
pub fn neighbors_per_shell(table: &NeighborTable, active: ActiveShells) -> Result<usize> {
    count_shell_neighbors(table, active, CountPolicy::Uniform).map(|c| c.truncation_width())
}

/// 在 `policy` 下计数仍然一致的最大 K（不超过 `max_shell`）
pub fn max_consistent_shells(table: &NeighborTable, max_shell: usize, policy: CountPolicy) -> usize {
    (1..=max_shell)
        .take_while(|&k| count_shell_neighbors(table, ActiveShells::new(k), policy).is_ok())
        .last()
        .unwrap_or(0)
}

/// 单个壳层在全体原子上的统计
#[derive(Debug, Clone, PartialEq)]
pub struct ShellStats {
    pub shell: usize,
    /// 各原子该壳层首个近邻距离的范围 (Å)
    pub min_distance: f64,
    pub max_distance: f64,
    /// 各原子该壳层近邻数的范围
    pub min_count: usize,
    pub max_count: usize,
}

impl ShellStats {
    /// 所有原子的近邻数相同
    pub fn is_uniform(&self) -> bool {
        self.min_count == self.max_count
    }
}

/// 所有原子都完整收录的壳层数
///
/// 每个原子候选列表的最后一个壳层可能被 `max_candidates` 截断，不计入。
pub fn complete_shells(table: &NeighborTable) -> usize {
    table
        .rows()
        .map(|row| row.last().map_or(0, |e| e.shell.saturating_sub(1)))
        .min()
        .unwrap_or(0)
}

/// 壳层 1..=`max_shell` 的统计
pub fn shell_statistics(table: &NeighborTable, max_shell: usize) -> Vec<ShellStats> {
    let active = ActiveShells::new(max_shell);
    let per_atom: Vec<Vec<usize>> = table
        .rows()
        .map(|row| atom_shell_counts(row, active))
        .collect();

    active
        .iter()
        .map(|shell| {
            let counts: Vec<usize> = per_atom.iter().map(|atom| atom[shell - 1]).collect();
            let distances: Vec<f64> = table
                .rows()
                .filter_map(|row| row.iter().find(|e| e.shell == shell))
                .map(|e| e.distance)
                .collect();

            ShellStats {
                shell,
                min_distance: distances.iter().copied().fold(f64::INFINITY, f64::min),
                max_distance: distances.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                min_count: counts.iter().copied().min().unwrap_or(0),
                max_count: counts.iter().copied().max().unwrap_or(0),
            }
        })
        .collect()
}
