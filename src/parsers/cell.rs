//! # CASTEP .cell 格式解析器
//!
//! 解析 CASTEP 输入文件 .cell 格式，包括位置行上的初始自旋注释。
//!
//! ## .cell 格式说明
//! ```text
//! %BLOCK LATTICE_CART
//! ang
//! a1 a2 a3
//! b1 b2 b3
//! c1 c2 c3
//! %ENDBLOCK LATTICE_CART
//!
//! %BLOCK POSITIONS_FRAC
//! Element x y z [SPIN=m]
//! Element:label x y z [SPIN=m]
//! ...
//! %ENDBLOCK POSITIONS_FRAC
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`
//! - 使用 `regex` 解析 SPIN 注释

use crate::error::{CinolaError, Result};
use crate::models::{Atom, Crystal, Lattice};

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// 匹配 `SPIN=2.0`、`spin : -1.5` 等写法
static SPIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bSPIN\s*[=:]?\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)")
        .expect("SPIN pattern is valid")
});

/// 解析 .cell 文件
pub fn parse_cell_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| CinolaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_cell_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 .cell 格式
pub fn parse_cell_content(content: &str, default_name: &str) -> Result<Crystal> {
    let content_upper = content.to_uppercase();
    let lines: Vec<&str> = content.lines().collect();

    let parse_error = |reason: &str| CinolaError::ParseError {
        format: "cell".to_string(),
        path: default_name.to_string(),
        reason: reason.to_string(),
    };

    // 解析 LATTICE_CART 或 LATTICE_ABC
    let lattice = if let Some(start) = find_block_start(&content_upper, "LATTICE_CART") {
        parse_lattice_cart(&lines, start)
            .ok_or_else(|| parse_error("Incomplete LATTICE_CART block"))?
    } else if let Some(start) = find_block_start(&content_upper, "LATTICE_ABC") {
        parse_lattice_abc(&lines, start).ok_or_else(|| {
            parse_error("Incomplete LATTICE_ABC block (need a b c alpha beta gamma)")
        })?
    } else {
        return Err(parse_error("Missing LATTICE_CART or LATTICE_ABC block"));
    };

    // 解析 POSITIONS_FRAC 或 POSITIONS_ABS
    let atoms = if let Some(start) = find_block_start(&content_upper, "POSITIONS_FRAC") {
        parse_positions(&lines, start)
    } else if let Some(start) = find_block_start(&content_upper, "POSITIONS_ABS") {
        parse_positions(&lines, start)
            .into_iter()
            .map(|mut atom| {
                atom.position = lattice.cart_to_frac(atom.position);
                atom
            })
            .collect()
    } else {
        return Err(parse_error("Missing POSITIONS_FRAC or POSITIONS_ABS block"));
    };

    let mut crystal = Crystal::new(default_name, lattice, atoms);
    crystal.source_format = Some("cell".to_string());

    Ok(crystal)
}

/// 查找 %BLOCK XXX 的起始行号
fn find_block_start(content_upper: &str, block_name: &str) -> Option<usize> {
    let pattern = format!("%BLOCK {}", block_name);
    content_upper
        .lines()
        .position(|line| line.trim().starts_with(&pattern))
}

/// 块内的有效数据行（跳过单位行、空行和注释）
fn block_lines<'a>(lines: &'a [&'a str], start: usize) -> impl Iterator<Item = &'a str> + 'a {
    lines
        .iter()
        .skip(start + 1)
        .map(|line| line.trim())
        .take_while(|line| !line.to_uppercase().starts_with("%ENDBLOCK"))
        .filter(|line| {
            !(line.is_empty()
                || line.starts_with('#')
                || line.starts_with('!')
                || line.eq_ignore_ascii_case("ang")
                || line.eq_ignore_ascii_case("bohr")
                || line.eq_ignore_ascii_case("nm"))
        })
}

/// 解析 LATTICE_CART 块
fn parse_lattice_cart(lines: &[&str], start: usize) -> Option<Lattice> {
    let rows: Vec<[f64; 3]> = block_lines(lines, start)
        .filter_map(|line| {
            let parts: Vec<f64> = line
                .split_whitespace()
                .filter_map(|s| s.parse().ok())
                .collect();
            (parts.len() >= 3).then(|| [parts[0], parts[1], parts[2]])
        })
        .take(3)
        .collect();

    match rows.as_slice() {
        [a, b, c] => Some(Lattice::from_vectors([*a, *b, *c])),
        _ => None,
    }
}

/// 解析 LATTICE_ABC 块
fn parse_lattice_abc(lines: &[&str], start: usize) -> Option<Lattice> {
    let params: Vec<f64> = block_lines(lines, start)
        .flat_map(|line| line.split_whitespace())
        .filter_map(|part| part.parse().ok())
        .collect();

    if params.len() < 6 {
        return None;
    }

    Some(Lattice::from_parameters(
        params[0], params[1], params[2], params[3], params[4], params[5],
    ))
}

/// 解析原子位置块
fn parse_positions(lines: &[&str], start: usize) -> Vec<Atom> {
    let mut atoms = Vec::new();

    for line in block_lines(lines, start) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }

        let (x, y, z) = match (
            parts[1].parse::<f64>(),
            parts[2].parse::<f64>(),
            parts[3].parse::<f64>(),
        ) {
            (Ok(x), Ok(y), Ok(z)) => (x, y, z),
            _ => continue,
        };

        // Fe:1 形式的自定义物种标签
        let mut atom = match parts[0].split_once(':') {
            Some((element, _)) => Atom::new(element, [x, y, z]).with_label(parts[0]),
            None => Atom::new(parts[0], [x, y, z]),
        };

        if let Some(m) = SPIN_PATTERN
            .captures(line)
            .and_then(|caps| caps[1].parse::<f64>().ok())
        {
            atom = atom.with_magmom(m);
        }

        atoms.push(atom);
    }

    atoms
}
