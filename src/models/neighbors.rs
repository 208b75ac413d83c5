//! # 近邻表数据模型
//!
//! - `NeighborTable`: 每个原子按距离升序排列的候选近邻（索引 + 壳层编号）
//! - `ShellMatrix`: 单个壳层（或多个壳层加权求和）的稀疏 N×N 邻接矩阵
//!
//! ## 依赖关系
//! - 由 `neighbors/` 生成
//! - 被 `topology/` 和 `commands/` 使用

use std::collections::{BTreeMap, BTreeSet};

/// 单个候选近邻
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborEntry {
    /// 近邻原子索引（从 0 开始）
    pub index: usize,
    /// 壳层编号（从 1 开始，1 为最近邻）
    pub shell: usize,
    /// 距离 (Å)
    pub distance: f64,
}

/// 全体原子的近邻表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborTable {
    rows: Vec<Vec<NeighborEntry>>,
}

impl NeighborTable {
    /// 由每个原子的近邻列表创建；每行应已按距离升序排列
    pub fn new(rows: Vec<Vec<NeighborEntry>>) -> Self {
        NeighborTable { rows }
    }

    /// 由 (索引, 壳层) 对创建，距离取壳层编号（用于手工构造的表）
    #[cfg(test)]
    pub fn from_pairs(rows: Vec<Vec<(usize, usize)>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(index, shell)| NeighborEntry {
                        index,
                        shell,
                        distance: shell as f64,
                    })
                    .collect()
            })
            .collect();
        NeighborTable { rows }
    }

    /// 原子数
    pub fn num_atoms(&self) -> usize {
        self.rows.len()
    }

    /// 第 `atom` 个原子的候选近邻
    pub fn row(&self, atom: usize) -> &[NeighborEntry] {
        self.rows.get(atom).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[NeighborEntry]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }

    /// 所有原子中出现过的最大壳层编号
    pub fn max_shell(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter().map(|e| e.shell))
            .max()
            .unwrap_or(0)
    }

    /// 第 `shell` 壳层的稀疏邻接矩阵：近邻 j 在原子 i 的列表中每出现一次，(i, j) 加 1
    pub fn shell_matrix(&self, shell: usize) -> ShellMatrix {
        let mut matrix = ShellMatrix::default();
        for (i, row) in self.rows.iter().enumerate() {
            for entry in row.iter().filter(|e| e.shell == shell) {
                matrix.add(i, entry.index, 1.0);
            }
        }
        matrix
    }
}

/// 稀疏方阵，仅存储显式写入过的元素
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShellMatrix {
    entries: BTreeMap<(usize, usize), f64>,
}

impl ShellMatrix {
    /// 累加元素 (row, col)
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        *self.entries.entry((row, col)).or_insert(0.0) += value;
    }

    #[cfg(test)]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.entries.get(&(row, col)).copied().unwrap_or(0.0)
    }

    /// 所有元素乘以 `weight`，稀疏结构保持不变
    pub fn scaled(&self, weight: f64) -> ShellMatrix {
        ShellMatrix {
            entries: self
                .entries
                .iter()
                .map(|(&key, &value)| (key, value * weight))
                .collect(),
        }
    }

    /// 逐元素累加另一矩阵
    pub fn add_assign(&mut self, other: &ShellMatrix) {
        for (&(row, col), &value) in &other.entries {
            self.add(row, col, value);
        }
    }

    /// 第 `row` 行中非零元素的列索引
    pub fn row_nonzeros(&self, row: usize) -> BTreeSet<usize> {
        self.entries
            .range((row, 0)..(row + 1, 0))
            .filter(|(_, &value)| value != 0.0)
            .map(|(&(_, col), _)| col)
            .collect()
    }

    /// 非零元素个数
    #[cfg(test)]
    pub fn nnz(&self) -> usize {
        self.entries.values().filter(|&&v| v != 0.0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> NeighborTable {
        NeighborTable::from_pairs(vec![
            vec![(1, 1), (1, 1), (0, 2)],
            vec![(0, 1), (0, 1), (1, 2)],
        ])
    }

    #[test]
    fn test_shell_matrix_counts_images() {
        let table = sample_table();
        let m1 = table.shell_matrix(1);

        // 周期像重复出现时权重累加
        assert_eq!(m1.get(0, 1), 2.0);
        assert_eq!(m1.get(1, 0), 2.0);
        assert_eq!(m1.get(0, 0), 0.0);
        assert_eq!(m1.nnz(), 2);

        let m2 = table.shell_matrix(2);
        assert_eq!(m2.row_nonzeros(0), BTreeSet::from([0]));
    }

    #[test]
    fn test_scaled_and_add_assign() {
        let table = sample_table();
        let mut total = table.shell_matrix(1).scaled(0.5);
        total.add_assign(&table.shell_matrix(2).scaled(-2.0));

        assert_eq!(total.get(0, 1), 1.0);
        assert_eq!(total.get(0, 0), -2.0);
        assert_eq!(total.row_nonzeros(0), BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_row_nonzeros_skips_cancelled_entries() {
        let mut m = ShellMatrix::default();
        m.add(2, 1, 1.0);
        m.add(2, 1, -1.0);
        m.add(2, 0, 3.0);
        assert_eq!(m.row_nonzeros(2), BTreeSet::from([0]));
        assert!(m.row_nonzeros(1).is_empty());
    }

    #[test]
    fn test_max_shell_and_rows() {
        let table = sample_table();
        assert_eq!(table.max_shell(), 2);
        assert_eq!(table.num_atoms(), 2);
        assert_eq!(table.row(5).len(), 0);
        assert_eq!(table.rows().count(), 2);
    }
}
