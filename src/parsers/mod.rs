//! # 解析器模块
//!
//! 提供结构文件和磁矩字符串的解析器。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: cell, poscar, magmom

pub mod cell;
pub mod magmom;
pub mod poscar;

use crate::error::{CinolaError, Result};
use crate::models::Crystal;
use std::path::Path;

/// 从文件路径推断格式并解析
pub fn parse_structure_file(path: &Path) -> Result<Crystal> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "cell" => cell::parse_cell_file(path),
        "vasp" | "poscar" => poscar::parse_poscar_file(path),
        _ => {
            // POSCAR/CONTCAR (无扩展名或带后缀)
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with("POSCAR") || name.starts_with("CONTCAR") {
                    return poscar::parse_poscar_file(path);
                }
            }
            Err(CinolaError::UnsupportedFormat(format!(
                "Cannot determine format for: {}",
                path.display()
            )))
        }
    }
}
