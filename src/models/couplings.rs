//! # 交换耦合常数模型
//!
//! 壳层编号 → 交换耦合常数 J 的显式映射。构造时校验壳层编号从 1 开始且连续，
//! 因此第 s 个壳层总能取到对应的 J，`len()` 即为活跃壳层数 K。
//!
//! ## 依赖关系
//! - 被 `topology/`、`writer/` 和 `cli/` 使用
//! - 使用 `error.rs`

use crate::error::{CinolaError, Result};
use std::collections::BTreeMap;
use std::str::FromStr;

/// 壳层 → J 的稠密映射
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CouplingMap {
    /// 下标 i 对应壳层 i + 1
    values: Vec<f64>,
}

impl CouplingMap {
    /// 从按壳层顺序排列的 J 列表创建
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        if let Some(pos) = values.iter().position(|j| !j.is_finite()) {
            return Err(CinolaError::InvalidCouplings(format!(
                "coupling for shell {} is not a finite number",
                pos + 1
            )));
        }
        Ok(CouplingMap { values })
    }

    /// 从 (壳层, J) 对创建，壳层必须恰好覆盖 1..=K
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut map: BTreeMap<usize, f64> = BTreeMap::new();
        for (shell, j) in pairs {
            if shell == 0 {
                return Err(CinolaError::InvalidCouplings(
                    "shell numbers start at 1".to_string(),
                ));
            }
            if map.insert(shell, j).is_some() {
                return Err(CinolaError::InvalidCouplings(format!(
                    "shell {} given more than once",
                    shell
                )));
            }
        }

        for (expected, &shell) in (1..).zip(map.keys()) {
            if shell != expected {
                return Err(CinolaError::InvalidCouplings(format!(
                    "shells must be contiguous from 1, shell {} is missing",
                    expected
                )));
            }
        }

        Self::from_values(map.into_values().collect())
    }

    /// 活跃壳层数 K
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 按壳层顺序的 J 列表
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 遍历 (壳层, J)
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values.iter().enumerate().map(|(i, &j)| (i + 1, j))
    }
}

/// 命令行格式：`1.0,-0.5` 或 `1=1.0,2=-0.5`
impl FromStr for CouplingMap {
    type Err = CinolaError;

    fn from_str(s: &str) -> Result<Self> {
        let items: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect();

        let parse_j = |text: &str| {
            text.trim().parse::<f64>().map_err(|_| {
                CinolaError::InvalidCouplings(format!("'{}' is not a number", text.trim()))
            })
        };

        if items.iter().any(|item| item.contains('=')) {
            let mut pairs = Vec::with_capacity(items.len());
            for item in items {
                let (shell, j) = item.split_once('=').ok_or_else(|| {
                    CinolaError::InvalidCouplings(format!(
                        "'{}' mixes positional and shell=value entries",
                        item
                    ))
                })?;
                let shell: usize = shell.trim().parse().map_err(|_| {
                    CinolaError::InvalidCouplings(format!("'{}' is not a shell number", shell))
                })?;
                pairs.push((shell, parse_j(j)?));
            }
            Self::from_pairs(pairs)
        } else {
            let values = items
                .into_iter()
                .map(parse_j)
                .collect::<Result<Vec<f64>>>()?;
            Self::from_values(values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_indexes_from_one() {
        let couplings = CouplingMap::from_values(vec![1.5, -0.25]).unwrap();
        assert_eq!(couplings.len(), 2);
        let collected: Vec<(usize, f64)> = couplings.iter().collect();
        assert_eq!(collected, vec![(1, 1.5), (2, -0.25)]);
    }

    #[test]
    fn test_from_pairs_unordered() {
        let couplings = CouplingMap::from_pairs(vec![(2, -0.5), (1, 1.0)]).unwrap();
        assert_eq!(couplings.values(), &[1.0, -0.5]);
    }

    #[test]
    fn test_from_pairs_rejects_gap() {
        let err = CouplingMap::from_pairs(vec![(1, 1.0), (3, 0.2)]).unwrap_err();
        assert!(err.to_string().contains("shell 2 is missing"));
    }

    #[test]
    fn test_from_pairs_rejects_zero_and_duplicates() {
        assert!(CouplingMap::from_pairs(vec![(0, 1.0)]).is_err());
        assert!(CouplingMap::from_pairs(vec![(1, 1.0), (1, 2.0)]).is_err());
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!(CouplingMap::from_values(vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_parse_positional_and_explicit() {
        let positional: CouplingMap = "1.0, -0.5".parse().unwrap();
        let explicit: CouplingMap = "2=-0.5,1=1.0".parse().unwrap();
        assert_eq!(positional, explicit);

        let collected: Vec<(usize, f64)> = explicit.iter().collect();
        assert_eq!(collected, vec![(1, 1.0), (2, -0.5)]);
    }

    #[test]
    fn test_parse_empty_string() {
        let couplings: CouplingMap = "".parse().unwrap();
        assert!(couplings.is_empty());
        assert_eq!(couplings, CouplingMap::default());
    }

    #[test]
    fn test_parse_mixed_is_rejected() {
        assert!("1.0,2=0.5".parse::<CouplingMap>().is_err());
        assert!("abc".parse::<CouplingMap>().is_err());
    }
}
