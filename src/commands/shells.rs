//! # shells 命令实现
//!
//! 列出结构的前几个近邻壳层：距离、每个原子的近邻数范围，以及两种计数规则下
//! 可用的最大壳层数 K。
//!
//! ## 依赖关系
//! - 使用 `cli/shells.rs` 定义的参数
//! - 使用 `parsers/`, `neighbors/`, `topology/counter.rs`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::cli::shells::ShellsArgs;
use crate::error::{CinolaError, Result};
use crate::models::NeighborTable;
use crate::neighbors::{PeriodicStructure, SearchSettings, SpinStructure};
use crate::parsers;
use crate::topology::{
    complete_shells, max_consistent_shells, neighbors_per_shell, shell_statistics, ActiveShells,
    CountPolicy,
};
use crate::utils::{output, progress};

use tabled::{Table, Tabled};

/// 壳层表格行
#[derive(Debug, Clone, Tabled)]
struct ShellRow {
    #[tabled(rename = "Shell")]
    shell: usize,
    #[tabled(rename = "Distance (Å)")]
    distance: String,
    #[tabled(rename = "Neighbors")]
    neighbors: String,
    #[tabled(rename = "Width (K = shell)")]
    width: String,
}

/// 执行 shells 命令
pub fn execute(args: ShellsArgs) -> Result<()> {
    output::print_header("Neighbor shells");

    if !args.input.is_file() {
        return Err(CinolaError::FileNotFound {
            path: args.input.display().to_string(),
        });
    }

    let crystal = parsers::parse_structure_file(&args.input)?;
    let settings = SearchSettings::new(args.shell_tolerance)?;
    let structure = PeriodicStructure::new(crystal).with_settings(settings);

    let crystal = structure.crystal();
    let (a, b, c, alpha, beta, gamma) = crystal.lattice.parameters();
    output::print_field("Structure", &crystal.name);
    output::print_field("Formula", crystal.formula());
    output::print_field("Atoms", crystal.atoms.len());
    output::print_field(
        "Lattice",
        format!(
            "{:.4} {:.4} {:.4} / {:.2} {:.2} {:.2}",
            a, b, c, alpha, beta, gamma
        ),
    );
    output::print_field("Candidates per atom", args.max_candidates);
    println!();

    let spinner = progress::create_spinner("Searching neighbors");
    let table = structure.neighbor_table(args.max_candidates);
    spinner.finish_and_clear();
    let table = table?;

    let complete = complete_shells(&table);
    output::print_field("Shells found", table.max_shell());
    if complete < args.shells {
        output::print_warning(&format!(
            "Only {} shell(s) are complete with {} candidates (raise --max-candidates)",
            complete, args.max_candidates
        ));
    }

    let rows = shell_rows(&table, args.shells.min(complete));
    if !rows.is_empty() {
        println!("{}", Table::new(&rows));
    }

    output::print_separator();
    output::print_field(
        "Max K (uniform)",
        max_consistent_shells(&table, complete, CountPolicy::Uniform),
    );
    output::print_field(
        "Max K (per-shell)",
        max_consistent_shells(&table, complete, CountPolicy::PerShell),
    );

    Ok(())
}

/// 壳层 1..=`max_shell` 的表格行
fn shell_rows(table: &NeighborTable, max_shell: usize) -> Vec<ShellRow> {
    shell_statistics(table, max_shell)
        .into_iter()
        .map(|stats| {
            let distance = if stats.max_distance - stats.min_distance < 1e-6 {
                format!("{:.4}", stats.min_distance)
            } else {
                format!("{:.4} - {:.4}", stats.min_distance, stats.max_distance)
            };
            let neighbors = if stats.is_uniform() {
                stats.min_count.to_string()
            } else {
                format!("{} - {}", stats.min_count, stats.max_count)
            };
            let width = neighbors_per_shell(table, ActiveShells::new(stats.shell))
                .map(|w| w.to_string())
                .unwrap_or_else(|_| "-".to_string());

            ShellRow {
                shell: stats.shell,
                distance,
                neighbors,
                width,
            }
        })
        .collect()
}
