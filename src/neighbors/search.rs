//! # 周期性近邻搜索
//!
//! 对周期晶体做暴力周期像搜索，得到每个原子按距离排序的候选近邻并划分壳层。
//!
//! ## 算法概述
//! 1. 按原子数密度估计包含 `max_candidates` 个近邻的球半径 r
//! 2. 根据晶面间距确定需要遍历的平移像范围
//! 3. 收集距离 ≤ r 的所有像（排除零距离的自身）
//! 4. 若某原子候选不足则放大 r 重试
//! 5. 排序、截断，并按距离容差划分壳层
//!
//! ## 依赖关系
//! - 被 `neighbors/mod.rs` 导出
//! - 使用 `models/structure.rs` 和 `models/neighbors.rs`
//! - 使用 `rayon` 并行处理各原子

use super::SpinStructure;
use crate::error::{CinolaError, Result};
use crate::models::structure::norm;
use crate::models::{Crystal, NeighborEntry, NeighborTable};

use rayon::prelude::*;
use std::cmp::Ordering;
use std::f64::consts::PI;

/// 距离低于该值视为原子自身
const SELF_DISTANCE: f64 = 1e-8;
/// 半径估计的安全系数
const RADIUS_SAFETY: f64 = 1.5;
/// 半径放大的最大次数
const MAX_RADIUS_GROWTH: usize = 12;

/// 近邻搜索设置
#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    /// 同一壳层内允许的距离差 (Å)
    pub shell_tolerance: f64,
}

impl SearchSettings {
    /// 容差必须是有限的非负数
    pub fn new(shell_tolerance: f64) -> Result<Self> {
        check_tolerance(shell_tolerance)?;
        Ok(SearchSettings { shell_tolerance })
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            shell_tolerance: 0.01,
        }
    }
}

/// NaN 会把所有近邻并入同一壳层，负值会让每个近邻各成一个壳层
fn check_tolerance(shell_tolerance: f64) -> Result<()> {
    if shell_tolerance.is_finite() && shell_tolerance >= 0.0 {
        Ok(())
    } else {
        Err(CinolaError::InvalidArgument(format!(
            "shell tolerance must be a finite non-negative distance (got {})",
            shell_tolerance
        )))
    }
}

/// 周期晶体 + 搜索设置
#[derive(Debug, Clone)]
pub struct PeriodicStructure {
    crystal: Crystal,
    settings: SearchSettings,
}

impl PeriodicStructure {
    pub fn new(crystal: Crystal) -> Self {
        PeriodicStructure {
            crystal,
            settings: SearchSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn crystal(&self) -> &Crystal {
        &self.crystal
    }
}

impl SpinStructure for PeriodicStructure {
    fn positions(&self) -> Vec<[f64; 3]> {
        self.crystal.cartesian_positions()
    }

    fn moments(&self) -> Vec<f64> {
        self.crystal.magmoms()
    }

    fn neighbor_table(&self, max_candidates: usize) -> Result<NeighborTable> {
        find_neighbors(&self.crystal, max_candidates, self.settings.shell_tolerance)
    }
}

/// 周期像中的一个候选近邻
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    index: usize,
    image: [i32; 3],
}

impl Candidate {
    fn order(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.index.cmp(&other.index))
            .then(self.image.cmp(&other.image))
    }
}

/// 搜索每个原子的前 `max_candidates` 个近邻
pub fn find_neighbors(
    crystal: &Crystal,
    max_candidates: usize,
    shell_tolerance: f64,
) -> Result<NeighborTable> {
    check_tolerance(shell_tolerance)?;

    let n_atoms = crystal.atoms.len();
    if n_atoms == 0 || max_candidates == 0 {
        return Ok(NeighborTable::new(vec![Vec::new(); n_atoms]));
    }

    let volume = crystal.lattice.volume().abs();
    if volume < 1e-10 {
        return Err(CinolaError::NeighborSearch(format!(
            "degenerate lattice for '{}' (volume {:.3e})",
            crystal.name, volume
        )));
    }

    // 分数坐标先折回 [0, 1)
    let wrapped: Vec<[f64; 3]> = crystal
        .atoms
        .iter()
        .map(|atom| atom.position.map(|x| x - x.floor()))
        .collect();
    let cartesian: Vec<[f64; 3]> = wrapped
        .iter()
        .map(|&frac| crystal.lattice.frac_to_cart(frac))
        .collect();

    let density = n_atoms as f64 / volume;
    let mut radius =
        (3.0 * (max_candidates + 1) as f64 / (4.0 * PI * density)).cbrt() * RADIUS_SAFETY;

    for _ in 0..MAX_RADIUS_GROWTH {
        let widths = crystal.lattice.perpendicular_widths();
        let reach = widths.map(|w| (radius / w).ceil() as i32 + 1);

        let candidates: Vec<Vec<Candidate>> = (0..n_atoms)
            .into_par_iter()
            .map(|i| collect_candidates(crystal, &cartesian, i, radius, reach))
            .collect();

        if candidates.iter().all(|c| c.len() >= max_candidates) {
            let rows = candidates
                .into_iter()
                .map(|mut row| {
                    row.sort_by(Candidate::order);
                    row.truncate(max_candidates);
                    assign_shells(&row, shell_tolerance)
                })
                .collect();
            return Ok(NeighborTable::new(rows));
        }

        radius *= 2.0;
    }

    Err(CinolaError::NeighborSearch(format!(
        "could not find {} neighbors per atom for '{}'",
        max_candidates, crystal.name
    )))
}

/// 收集原子 i 周围半径 r 内的全部周期像
fn collect_candidates(
    crystal: &Crystal,
    cartesian: &[[f64; 3]],
    i: usize,
    radius: f64,
    reach: [i32; 3],
) -> Vec<Candidate> {
    let origin = cartesian[i];
    let mut found = Vec::new();

    for na in -reach[0]..=reach[0] {
        for nb in -reach[1]..=reach[1] {
            for nc in -reach[2]..=reach[2] {
                let shift = crystal
                    .lattice
                    .frac_to_cart([na as f64, nb as f64, nc as f64]);
                for (j, pos) in cartesian.iter().enumerate() {
                    let delta = [
                        pos[0] + shift[0] - origin[0],
                        pos[1] + shift[1] - origin[1],
                        pos[2] + shift[2] - origin[2],
                    ];
                    let distance = norm(delta);
                    if distance < SELF_DISTANCE || distance > radius {
                        continue;
                    }
                    found.push(Candidate {
                        distance,
                        index: j,
                        image: [na, nb, nc],
                    });
                }
            }
        }
    }

    found
}

/// 按距离容差划分壳层：距离超出当前壳层首个距离 `tolerance` 即开启新壳层
fn assign_shells(sorted: &[Candidate], tolerance: f64) -> Vec<NeighborEntry> {
    let mut shell = 0;
    let mut shell_start = f64::NEG_INFINITY;

    sorted
        .iter()
        .map(|c| {
            if c.distance - shell_start > tolerance {
                shell += 1;
                shell_start = c.distance;
            }
            NeighborEntry {
                index: c.index,
                shell,
                distance: c.distance,
            }
        })
        .collect()
}
