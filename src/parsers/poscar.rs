//! # VASP POSCAR 格式解析器
//!
//! 解析 VASP POSCAR/CONTCAR 文件格式。
//!
//! ## POSCAR 格式说明
//! ```text
//! Comment line (structure name)
//! 1.0                    # scaling factor (负值表示目标体积)
//! a1 a2 a3               # lattice vector a
//! b1 b2 b3               # lattice vector b
//! c1 c2 c3               # lattice vector c
//! Element1 Element2 ...  # element symbols (VASP 5+)
//! n1 n2 ...              # number of atoms per element
//! Selective dynamics     # optional
//! Direct/Cartesian       # coordinate type
//! x1 y1 z1               # atom positions
//! ...
//! ```
//!
//! POSCAR 不含磁矩，磁矩由 `--magmoms`（`parsers/magmom.rs`）另行提供。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{CinolaError, Result};
use crate::models::{Atom, Crystal, Lattice};
use std::fs;
use std::path::Path;

/// 解析 POSCAR/CONTCAR 文件
pub fn parse_poscar_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| CinolaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_poscar_content(
        &content,
        path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 POSCAR 格式
pub fn parse_poscar_content(content: &str, default_name: &str) -> Result<Crystal> {
    let lines: Vec<&str> = content.lines().collect();

    let parse_error = |reason: String| CinolaError::ParseError {
        format: "poscar".to_string(),
        path: default_name.to_string(),
        reason,
    };

    if lines.len() < 8 {
        return Err(parse_error("File too short".to_string()));
    }

    // Line 0: Comment/name
    let name = match lines[0].trim() {
        "" => default_name.to_string(),
        comment => comment.to_string(),
    };

    // Line 1: Scaling factor
    let scale: f64 = lines[1]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| parse_error("Invalid scaling factor at line 2".to_string()))?;

    // Lines 2-4: Lattice vectors
    let mut matrix = [[0.0; 3]; 3];
    for (i, row) in matrix.iter_mut().enumerate() {
        *row = parse_vector(lines[2 + i])
            .ok_or_else(|| parse_error(format!("Invalid lattice vector at line {}", 3 + i)))?;
    }

    // 负的缩放因子表示晶胞体积
    let factor = if scale < 0.0 {
        let raw_volume = Lattice::from_vectors(matrix).volume().abs();
        (-scale / raw_volume).cbrt()
    } else {
        scale
    };
    let lattice = Lattice::from_vectors(matrix.map(|row| row.map(|x| x * factor)));

    // Line 5: Element symbols (VASP 5+) or atom counts (VASP 4)
    let line5: Vec<&str> = lines[5].split_whitespace().collect();
    let vasp4 = line5
        .first()
        .map(|s| s.parse::<usize>().is_ok())
        .ok_or_else(|| parse_error("Missing species line".to_string()))?;

    let (elements, counts_line, next_line) = if vasp4 {
        let elements: Vec<String> = (1..=line5.len()).map(|i| format!("X{}", i)).collect();
        (elements, lines[5], 6)
    } else {
        let elements: Vec<String> = line5.iter().map(|s| s.to_string()).collect();
        (elements, lines[6], 7)
    };

    let counts: Vec<usize> = counts_line
        .split_whitespace()
        .map(|s| s.parse())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| parse_error("Invalid atom counts".to_string()))?;

    if counts.len() != elements.len() {
        return Err(parse_error(format!(
            "{} species but {} atom counts",
            elements.len(),
            counts.len()
        )));
    }

    // Optional "Selective dynamics" line, then coordinate type line
    let mut coord_line = next_line;
    if lines
        .get(coord_line)
        .is_some_and(|l| l.trim().to_lowercase().starts_with('s'))
    {
        coord_line += 1;
    }

    let coord_type = lines
        .get(coord_line)
        .map(|l| l.trim().to_lowercase())
        .ok_or_else(|| parse_error("Missing coordinate type line".to_string()))?;
    let is_cartesian = coord_type.starts_with('c') || coord_type.starts_with('k');

    // Atom positions
    let species = elements
        .iter()
        .zip(&counts)
        .flat_map(|(elem, &count)| std::iter::repeat(elem).take(count));

    let mut atoms = Vec::with_capacity(counts.iter().sum());
    for (offset, elem) in species.enumerate() {
        let line_no = coord_line + 1 + offset;
        let position = lines
            .get(line_no)
            .and_then(|l| parse_vector(l))
            .ok_or_else(|| parse_error(format!("Invalid atom position at line {}", line_no + 1)))?;

        let position = if is_cartesian {
            lattice.cart_to_frac(position.map(|x| x * factor))
        } else {
            position
        };
        atoms.push(Atom::new(elem.clone(), position));
    }

    let mut crystal = Crystal::new(name, lattice, atoms);
    crystal.source_format = Some("poscar".to_string());

    Ok(crystal)
}

/// 解析一行中的前三个浮点数
fn parse_vector(line: &str) -> Option<[f64; 3]> {
    let mut parts = line.split_whitespace().map(|s| s.parse::<f64>());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => Some([x, y, z]),
        _ => None,
    }
}
