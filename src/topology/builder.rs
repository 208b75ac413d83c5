//! # 定宽拓扑构建
//!
//! 由近邻表和交换耦合常数生成截断近邻表与壳层分配表。
//!
//! ## 算法概述
//! 1. 确定活跃壳层和截断宽度 W
//! 2. 对每个原子生成完整长度的数组：活跃壳层近邻记为 索引 + 1，其余记为 0
//! 3. 位置 ≥ W 的元素必须全为 0，即活跃壳层恰好是排序最靠前的近邻
//! 4. 截取前 W 列得到近邻表；用壳层编号代替索引得到壳层分配表
//! 5. 可选：用加权壳层邻接矩阵之和交叉校验原子 0 的近邻集合
//!
//! ## 依赖关系
//! - 被 `commands/generate.rs` 调用
//! - 使用 `topology/shells.rs`、`topology/counter.rs`
//! - 使用 `neighbors/` 的 `SpinStructure` 获取壳层邻接矩阵

use super::counter::{count_shell_neighbors, CountPolicy, ShellCounts};
use super::shells::{active_shells, ActiveShells};
use crate::error::{CinolaError, Result};
use crate::models::{CouplingMap, NeighborEntry, NeighborTable, ShellMatrix};
use crate::neighbors::SpinStructure;

use std::collections::BTreeSet;

/// 定宽拓扑
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    /// 各活跃壳层的近邻数
    pub shell_counts: ShellCounts,
    /// 截断近邻表：1-based 近邻索引，0 表示无近邻
    pub neighbors: Vec<Vec<usize>>,
    /// 壳层分配表：与 `neighbors` 一一对应的壳层编号，0 表示无近邻
    pub assignments: Vec<Vec<usize>>,
}

impl Topology {
    /// 活跃壳层数 K
    pub fn num_shells(&self) -> usize {
        self.shell_counts.num_shells()
    }

    /// 每个原子保留的近邻槽位数
    pub fn width(&self) -> usize {
        self.shell_counts.truncation_width()
    }

    pub fn num_atoms(&self) -> usize {
        self.neighbors.len()
    }
}

/// 拓扑构建器
#[derive(Debug, Clone)]
pub struct TopologyBuilder<'a> {
    couplings: &'a CouplingMap,
    policy: CountPolicy,
    verify: bool,
}

impl<'a> TopologyBuilder<'a> {
    pub fn new(couplings: &'a CouplingMap) -> Self {
        TopologyBuilder {
            couplings,
            policy: CountPolicy::default(),
            verify: false,
        }
    }

    /// 设置壳层计数规则
    pub fn policy(mut self, policy: CountPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 是否启用耦合矩阵交叉校验
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// 构建定宽拓扑
    pub fn build<S>(&self, structure: &S, table: &NeighborTable) -> Result<Topology>
    where
        S: SpinStructure + ?Sized,
    {
        let active = active_shells(self.couplings);
        let shell_counts = count_shell_neighbors(table, active, self.policy)?;
        let width = shell_counts.truncation_width();

        let mut neighbors = Vec::with_capacity(table.num_atoms());
        let mut assignments = Vec::with_capacity(table.num_atoms());

        for (atom, row) in table.rows().enumerate() {
            let full_neighbors = mask_row(row, active, |e| e.index + 1);
            check_ordering(atom, &full_neighbors, width)?;

            neighbors.push(truncate(full_neighbors, width));
            assignments.push(truncate(mask_row(row, active, |e| e.shell), width));
        }

        if self.verify {
            verify_coupling_map(structure, table, self.couplings, width)?;
        }

        Ok(Topology {
            shell_counts,
            neighbors,
            assignments,
        })
    }
}

/// 活跃壳层的近邻取 `value(entry)`，其余为 0
fn mask_row<F>(row: &[NeighborEntry], active: ActiveShells, value: F) -> Vec<usize>
where
    F: Fn(&NeighborEntry) -> usize,
{
    row.iter()
        .map(|e| if active.contains(e.shell) { value(e) } else { 0 })
        .collect()
}

/// 截断宽度以外不允许出现活跃壳层近邻
fn check_ordering(atom: usize, full: &[usize], width: usize) -> Result<()> {
    match full.iter().skip(width).position(|&v| v != 0) {
        Some(offset) => Err(CinolaError::ShellOrderingViolation {
            atom,
            position: width + offset,
            width,
        }),
        None => Ok(()),
    }
}

/// 截断（或补 0）到恰好 `width` 列
fn truncate(mut full: Vec<usize>, width: usize) -> Vec<usize> {
    full.resize(width, 0);
    full
}

/// 交叉校验：各活跃壳层邻接矩阵按 J 加权求和后，原子 0 的非零列
/// 必须等于其前 `width` 个候选中活跃壳层近邻的索引集合
pub fn verify_coupling_map<S>(
    structure: &S,
    table: &NeighborTable,
    couplings: &CouplingMap,
    width: usize,
) -> Result<()>
where
    S: SpinStructure + ?Sized,
{
    if table.num_atoms() == 0 {
        return Ok(());
    }

    let active = active_shells(couplings);
    let mut combined = ShellMatrix::default();
    for (shell, j) in couplings.iter() {
        combined.add_assign(&structure.shell_adjacency(table, shell).scaled(j));
    }

    let actual = combined.row_nonzeros(0);
    let expected: BTreeSet<usize> = table
        .row(0)
        .iter()
        .take(width)
        .filter(|e| active.contains(e.shell))
        .map(|e| e.index)
        .collect();

    if actual == expected {
        return Ok(());
    }

    Err(CinolaError::CouplingMappingMismatch {
        atom: 0,
        missing: expected.difference(&actual).copied().collect(),
        unexpected: actual.difference(&expected).copied().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Crystal, Lattice};
    use crate::neighbors::PeriodicStructure;

    /// 手工构造近邻表的结构
    struct TableStructure {
        table: NeighborTable,
    }

    impl TableStructure {
        fn new(rows: Vec<Vec<(usize, usize)>>) -> Self {
            TableStructure {
                table: NeighborTable::from_pairs(rows),
            }
        }
    }

    impl SpinStructure for TableStructure {
        fn positions(&self) -> Vec<[f64; 3]> {
            vec![[0.0; 3]; self.table.num_atoms()]
        }

        fn moments(&self) -> Vec<f64> {
            vec![0.0; self.table.num_atoms()]
        }

        fn neighbor_table(&self, _max_candidates: usize) -> Result<NeighborTable> {
            Ok(self.table.clone())
        }
    }

    /// 两个原子，各有 4 个壳层 1 近邻，随后 8 个壳层 2 近邻
    fn two_atom_structure() -> TableStructure {
        TableStructure::new(vec![
            [vec![(1, 1); 4], vec![(0, 2); 8]].concat(),
            [vec![(0, 1); 4], vec![(1, 2); 8]].concat(),
        ])
    }

    fn build(structure: &TableStructure, js: Vec<f64>) -> Result<Topology> {
        let couplings = CouplingMap::from_values(js)?;
        TopologyBuilder::new(&couplings).build(structure, &structure.table)
    }

    fn assert_table_properties(topology: &Topology, k: usize) {
        for (n_row, a_row) in topology.neighbors.iter().zip(&topology.assignments) {
            assert_eq!(n_row.len(), topology.width());
            assert_eq!(a_row.len(), topology.width());

            let n_nonzero = n_row.iter().filter(|&&v| v != 0).count();
            let a_nonzero = a_row.iter().filter(|&&v| v != 0).count();
            assert_eq!(n_nonzero, a_nonzero);

            for (&n, &a) in n_row.iter().zip(a_row) {
                assert!(a <= k);
                assert_eq!(n == 0, a == 0);
            }
        }
    }

    #[test]
    fn test_scenario_single_coupling() {
        let structure = two_atom_structure();
        let topology = build(&structure, vec![1.0]).unwrap();

        assert_eq!(topology.num_shells(), 1);
        assert_eq!(topology.shell_counts.uniform(), Some(4));
        assert_eq!(topology.width(), 4);
        assert_eq!(topology.neighbors, vec![vec![2; 4], vec![1; 4]]);
        assert_eq!(topology.assignments, vec![vec![1; 4], vec![1; 4]]);
        assert_table_properties(&topology, 1);
    }

    #[test]
    fn test_scenario_two_couplings_needs_per_shell_counts() {
        let structure = two_atom_structure();

        // 4 与 8 不是同一个 M
        let err = build(&structure, vec![1.0, 0.5]).unwrap_err();
        assert!(matches!(err, CinolaError::StructuralInconsistency { .. }));

        let couplings = CouplingMap::from_values(vec![1.0, 0.5]).unwrap();
        let topology = TopologyBuilder::new(&couplings)
            .policy(CountPolicy::PerShell)
            .verify(true)
            .build(&structure, &structure.table)
            .unwrap();

        assert_eq!(topology.width(), 12);
        assert_eq!(topology.neighbors[0][..4], [2, 2, 2, 2]);
        assert_eq!(topology.neighbors[0][4..], [1; 8]);
        assert_eq!(topology.assignments[1][..4], [1; 4]);
        assert_eq!(topology.assignments[1][4..], [2; 8]);
        assert_table_properties(&topology, 2);
    }

    #[test]
    fn test_uniform_two_shells_width() {
        let structure = TableStructure::new(vec![
            vec![(1, 1), (1, 1), (0, 2), (0, 2), (1, 3)],
            vec![(0, 1), (0, 1), (1, 2), (1, 2), (0, 3)],
        ]);
        let topology = build(&structure, vec![1.0, -0.3]).unwrap();

        assert_eq!(topology.width(), 4);
        assert_eq!(topology.neighbors, vec![vec![2, 2, 1, 1], vec![1, 1, 2, 2]]);
        assert_eq!(topology.assignments, vec![vec![1, 1, 2, 2]; 2]);
    }

    #[test]
    fn test_scenario_gap_between_shells() {
        let structure = TableStructure::new(vec![
            [vec![(1, 1); 4], vec![(0, 2); 8]].concat(),
            // 壳层 2 近邻插在最后一个壳层 1 近邻之前
            [vec![(0, 1); 3], vec![(1, 2)], vec![(0, 1)], vec![(1, 2); 7]].concat(),
        ]);

        // 两个壳层都活跃时间隙落在截断宽度之内
        let couplings = CouplingMap::from_values(vec![1.0, 0.5]).unwrap();
        let topology = TopologyBuilder::new(&couplings)
            .policy(CountPolicy::PerShell)
            .build(&structure, &structure.table)
            .unwrap();
        assert_eq!(topology.assignments[1][..5], [1, 1, 1, 2, 1]);

        match build(&structure, vec![1.0]).unwrap_err() {
            CinolaError::ShellOrderingViolation {
                atom,
                position,
                width,
            } => {
                assert_eq!(atom, 1);
                assert_eq!(position, 4);
                assert_eq!(width, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scenario_inactive_shell_interleaved() {
        // K = 1 时壳层 3 近邻排在最后一个壳层 1 近邻之前
        let structure = TableStructure::new(vec![
            vec![(1, 1), (1, 1), (1, 1), (1, 3), (1, 1)],
            vec![(0, 1), (0, 1), (0, 1), (0, 1), (0, 3)],
        ]);
        let err = build(&structure, vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            CinolaError::ShellOrderingViolation {
                atom: 0,
                position: 4,
                width: 4
            }
        ));
    }

    #[test]
    fn test_scenario_non_uniform_atoms() {
        let structure = TableStructure::new(vec![vec![(1, 1); 4], vec![(0, 1); 5]]);
        let err = build(&structure, vec![1.0]).unwrap_err();
        assert!(matches!(err, CinolaError::StructuralInconsistency { .. }));
    }

    #[test]
    fn test_scenario_no_couplings() {
        let structure = two_atom_structure();
        let topology = build(&structure, vec![]).unwrap();

        assert_eq!(topology.num_shells(), 0);
        assert_eq!(topology.width(), 0);
        assert_eq!(topology.num_atoms(), 2);
        assert!(topology.neighbors.iter().all(Vec::is_empty));
        assert!(topology.assignments.iter().all(Vec::is_empty));
    }

    #[test]
    fn test_build_is_idempotent() {
        let structure = two_atom_structure();
        let first = build(&structure, vec![1.0]).unwrap();
        let second = build(&structure, vec![1.0]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_verify_passes_on_consistent_table() {
        let structure = two_atom_structure();
        let couplings = CouplingMap::from_values(vec![1.0]).unwrap();
        assert!(verify_coupling_map(&structure, &structure.table, &couplings, 4).is_ok());
    }

    #[test]
    fn test_verify_reports_mismatch() {
        // 原子 0 的壳层 1 近邻中，索引 2 落在截断宽度之外
        let structure = TableStructure::new(vec![
            vec![(1, 1), (0, 2), (2, 1)],
            vec![(0, 1), (2, 1)],
            vec![(0, 1), (1, 1)],
        ]);
        let couplings = CouplingMap::from_values(vec![1.0]).unwrap();
        let err = verify_coupling_map(&structure, &structure.table, &couplings, 2).unwrap_err();

        match err {
            CinolaError::CouplingMappingMismatch {
                atom,
                missing,
                unexpected,
            } => {
                assert_eq!(atom, 0);
                assert!(missing.is_empty());
                assert_eq!(unexpected, vec![2]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_verify_flags_zero_coupling() {
        let structure = TableStructure::new(vec![
            vec![(1, 1), (2, 2)],
            vec![(0, 1), (2, 2)],
            vec![(1, 1), (0, 2)],
        ]);
        let couplings = CouplingMap::from_values(vec![1.0, 0.0]).unwrap();
        let err = verify_coupling_map(&structure, &structure.table, &couplings, 2).unwrap_err();
        assert!(matches!(
            err,
            CinolaError::CouplingMappingMismatch { ref missing, .. } if missing == &vec![2]
        ));
    }

    #[test]
    fn test_bcc_nearest_neighbor_topology() {
        let lattice = Lattice::from_parameters(2.87, 2.87, 2.87, 90.0, 90.0, 90.0);
        let crystal = Crystal::new(
            "Fe-bcc",
            lattice,
            vec![
                Atom::new("Fe", [0.0, 0.0, 0.0]),
                Atom::new("Fe", [0.5, 0.5, 0.5]),
            ],
        );
        let structure = PeriodicStructure::new(crystal);
        let table = structure.neighbor_table(100).unwrap();

        let couplings = CouplingMap::from_values(vec![-0.02]).unwrap();
        let topology = TopologyBuilder::new(&couplings)
            .verify(true)
            .build(&structure, &table)
            .unwrap();

        assert_eq!(topology.width(), 8);
        assert_eq!(topology.neighbors, vec![vec![2; 8], vec![1; 8]]);
        assert_table_properties(&topology, 1);

        // 8 个最近邻与 6 个次近邻数目不同
        let two = CouplingMap::from_values(vec![-0.02, 0.01]).unwrap();
        assert!(TopologyBuilder::new(&two).build(&structure, &table).is_err());
        let per_shell = TopologyBuilder::new(&two)
            .policy(CountPolicy::PerShell)
            .verify(true)
            .build(&structure, &table)
            .unwrap();
        assert_eq!(per_shell.width(), 14);
        assert_eq!(per_shell.assignments[0][8..], [2; 6]);
        assert_eq!(per_shell.neighbors[0][8..], [1; 6]);
    }
}
