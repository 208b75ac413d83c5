//! # MAGMOM 字符串解析
//!
//! 解析 VASP INCAR 中 MAGMOM 标签的写法，例如 `2*3.0 -3.0 0`。
//! 也接受逗号分隔，或整行 `MAGMOM = ...`。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `regex` 识别 `N*value` 重复项

use crate::error::{CinolaError, Result};

use regex::Regex;
use std::sync::LazyLock;

/// `N*value` 重复项
static REPEAT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\*(.+)$").expect("repeat pattern is valid"));

/// 展开 MAGMOM 字符串为逐原子磁矩
pub fn parse_magmoms(text: &str) -> Result<Vec<f64>> {
    // 允许直接粘贴 INCAR 行 `MAGMOM = ...`
    let text = text.split_once('=').map_or(text, |(_, rest)| rest);

    let mut moments = Vec::new();
    for token in text.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }

        let (repeat, value) = match REPEAT_PATTERN.captures(token) {
            Some(caps) => {
                let repeat: usize = caps[1]
                    .parse()
                    .map_err(|_| CinolaError::InvalidMagmoms(format!("bad repeat in '{}'", token)))?;
                (repeat, caps.get(2).map_or("", |m| m.as_str()))
            }
            None => (1, token),
        };

        let value: f64 = value
            .parse()
            .map_err(|_| CinolaError::InvalidMagmoms(format!("'{}' is not a number", value)))?;
        if !value.is_finite() {
            return Err(CinolaError::InvalidMagmoms(format!(
                "'{}' is not a finite moment",
                token
            )));
        }
        moments.extend(std::iter::repeat(value).take(repeat));
    }

    Ok(moments)
}

/// 解析并检查数目与原子数一致
pub fn parse_magmoms_for(text: &str, num_atoms: usize) -> Result<Vec<f64>> {
    let moments = parse_magmoms(text)?;
    if moments.len() != num_atoms {
        return Err(CinolaError::InvalidMagmoms(format!(
            "got {} moments for {} atoms",
            moments.len(),
            num_atoms
        )));
    }
    Ok(moments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_list() {
        assert_eq!(parse_magmoms("1.0 -1.0 0").unwrap(), vec![1.0, -1.0, 0.0]);
        assert_eq!(parse_magmoms("1.0,-1.0").unwrap(), vec![1.0, -1.0]);
    }

    #[test]
    fn test_parse_repeats() {
        assert_eq!(
            parse_magmoms("2*3.0 -3.0 2*0").unwrap(),
            vec![3.0, 3.0, -3.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_parse_incar_line() {
        assert_eq!(parse_magmoms("MAGMOM = 2*2.2").unwrap(), vec![2.2, 2.2]);
    }

    #[test]
    fn test_count_mismatch() {
        assert!(parse_magmoms_for("2*1.0", 2).is_ok());
        let err = parse_magmoms_for("2*1.0", 3).unwrap_err();
        assert!(err.to_string().contains("got 2 moments for 3 atoms"));
    }

    #[test]
    fn test_invalid_value() {
        assert!(parse_magmoms("2*up").is_err());
        assert!(parse_magmoms("1.0 x").is_err());
    }

    #[test]
    fn test_non_finite_value() {
        for text in ["nan", "1.0 inf", "2*NaN", "-infinity"] {
            assert!(matches!(
                parse_magmoms(text),
                Err(CinolaError::InvalidMagmoms(_))
            ));
        }
    }
}
