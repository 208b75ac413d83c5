//! # generate 命令实现
//!
//! 由结构文件生成求解器输入集。
//!
//! ## 功能
//! - 读取 POSCAR/CONTCAR/.cell 结构，可用 `--magmoms` 覆盖初始磁矩
//! - 周期近邻搜索并划分壳层，活跃壳层必须在候选范围内完整
//! - 构建定宽近邻表与壳层分配表，可选交叉校验
//! - 写出全部输入文件
//! - 目录输入时并行批量处理，拓扑不满足约束的结构跳过，并写出 `summary.csv`
//!
//! ## 依赖关系
//! - 使用 `cli/generate.rs` 定义的参数
//! - 使用 `parsers/`, `neighbors/`, `topology/`, `writer/`, `batch/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::batch::{structure_id, BatchRunner, FileCollector, ProcessStatus};
use crate::cli::generate::{GenerateArgs, ShellCounting};
use crate::error::{CinolaError, Result};
use crate::models::Crystal;
use crate::neighbors::{PeriodicStructure, SearchSettings, SpinStructure};
use crate::parsers;
use crate::parsers::magmom::parse_magmoms_for;
use crate::topology::{complete_shells, CountPolicy, Topology, TopologyBuilder};
use crate::utils::{output, progress};
use crate::writer::{write_input_set, SolverConfig, WriteStatus};

use serde::Serialize;
use std::path::Path;
use tabled::{Table, Tabled};

/// 批量汇总文件名
const SUMMARY_FILE: &str = "summary.csv";

/// 壳层摘要行
#[derive(Debug, Clone, Tabled)]
struct ShellRow {
    #[tabled(rename = "Shell")]
    shell: usize,
    #[tabled(rename = "J")]
    coupling: String,
    #[tabled(rename = "Neighbors")]
    neighbors: usize,
}

/// 批量处理记录，同时作为 `summary.csv` 的一行
#[derive(Debug, Clone, Serialize, Tabled)]
struct SummaryRecord {
    #[tabled(rename = "Structure")]
    structure: String,
    #[tabled(rename = "Atoms")]
    atoms: usize,
    #[tabled(rename = "Shells")]
    shells: usize,
    #[tabled(rename = "Width")]
    width: usize,
    #[tabled(rename = "Status")]
    status: ProcessStatus,
    #[tabled(rename = "Message")]
    message: String,
}

/// 单个结构的生成结果
struct Generated {
    topology: Topology,
    status: WriteStatus,
}

impl From<ShellCounting> for CountPolicy {
    fn from(counting: ShellCounting) -> Self {
        match counting {
            ShellCounting::Uniform => CountPolicy::Uniform,
            ShellCounting::PerShell => CountPolicy::PerShell,
        }
    }
}

/// 执行 generate 命令
pub fn execute(args: GenerateArgs) -> Result<()> {
    output::print_header("Generating Monte Carlo input");

    if !args.input.exists() {
        return Err(CinolaError::FileNotFound {
            path: args.input.display().to_string(),
        });
    }

    solver_config(&args, "")
        .validate()
        .map_err(CinolaError::InvalidArgument)?;

    if args.couplings.is_empty() {
        output::print_warning("No couplings given, generating a non-interacting system");
    }

    if args.input.is_file() {
        execute_single(&args)
    } else {
        execute_batch(&args)
    }
}

/// 单个结构 → `args.output`
fn execute_single(args: &GenerateArgs) -> Result<()> {
    let spinner = progress::create_spinner("Searching neighbors");
    let result = generate_structure(&args.input, &args.output, None, args);
    spinner.finish_and_clear();
    let generated = result?;

    let topology = &generated.topology;
    let per_shell = match topology.shell_counts.uniform() {
        Some(m) => format!(" ({} per shell)", m),
        None => String::new(),
    };
    output::print_success(&format!(
        "{} atoms, {} active shell(s), truncation width {}{}",
        topology.num_atoms(),
        topology.num_shells(),
        topology.width(),
        per_shell
    ));

    let rows: Vec<ShellRow> = args
        .couplings
        .iter()
        .map(|(shell, j)| ShellRow {
            shell,
            coupling: format!("{:.6}", j),
            neighbors: topology.shell_counts.get(shell).unwrap_or(0),
        })
        .collect();
    if !rows.is_empty() {
        println!("{}", Table::new(&rows));
    }

    match generated.status {
        WriteStatus::Written(files) => output::print_done(&format!(
            "Wrote {} file(s) to '{}'",
            files.len(),
            args.output.display()
        )),
        WriteStatus::Skipped => output::print_skip(&format!(
            "'{}' already contains input files (use --overwrite)",
            args.output.display()
        )),
    }

    Ok(())
}

/// 目录 → 每个结构一个子目录
fn execute_batch(args: &GenerateArgs) -> Result<()> {
    let files = FileCollector::new(&args.input)
        .with_pattern(&args.pattern)?
        .recursive(args.recursive)
        .collect();

    if files.is_empty() {
        output::print_warning(&format!(
            "No files matched '{}' under {}",
            args.pattern,
            args.input.display()
        ));
        return Ok(());
    }

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!(
        "Found {} structure(s), running with {} job(s)",
        files.len(),
        runner.jobs()
    ));

    let result = runner.run(&files, |file| {
        let id = structure_id(&args.input, file);
        let out_dir = args.output.join(&id);
        process_file(file, &out_dir, id, args)
    })?;

    for record in &result.records {
        match record.status {
            ProcessStatus::Rejected => {
                output::print_rejected(&format!("{}: {}", record.structure, record.message))
            }
            ProcessStatus::Failed => {
                output::print_error(&format!("{}: {}", record.structure, record.message))
            }
            ProcessStatus::Skipped => output::print_skip(&record.structure),
            ProcessStatus::Success => {}
        }
    }

    let summary_path = args.output.join(SUMMARY_FILE);
    write_summary(&result.records, &summary_path)?;

    let problems: Vec<&SummaryRecord> = result
        .records
        .iter()
        .filter(|r| matches!(r.status, ProcessStatus::Rejected | ProcessStatus::Failed))
        .collect();
    if !problems.is_empty() {
        output::print_separator();
        println!("{}", Table::new(problems));
    }

    output::print_done(&format!(
        "{} structure(s): {} generated, {} skipped, {} rejected, {} failed (summary: '{}')",
        result.total(),
        result.success,
        result.skipped,
        result.rejected,
        result.failed,
        summary_path.display()
    ));

    Ok(())
}

/// 处理单个文件并转为汇总记录
fn process_file(
    file: &Path,
    out_dir: &Path,
    id: String,
    args: &GenerateArgs,
) -> (ProcessStatus, SummaryRecord) {
    let mut record = SummaryRecord {
        structure: id,
        atoms: 0,
        shells: 0,
        width: 0,
        status: ProcessStatus::Success,
        message: String::new(),
    };

    match generate_structure(file, out_dir, Some(&record.structure), args) {
        Ok(generated) => {
            record.atoms = generated.topology.num_atoms();
            record.shells = generated.topology.num_shells();
            record.width = generated.topology.width();
            if generated.status == WriteStatus::Skipped {
                record.status = ProcessStatus::Skipped;
                record.message = "output exists".to_string();
            }
        }
        Err(e) => {
            record.status = if e.is_topology_error() {
                ProcessStatus::Rejected
            } else {
                ProcessStatus::Failed
            };
            record.message = e.to_string();
        }
    }

    (record.status, record)
}

/// 结构文件 → 输入文件集
fn generate_structure(
    file: &Path,
    out_dir: &Path,
    name: Option<&str>,
    args: &GenerateArgs,
) -> Result<Generated> {
    let crystal = load_structure(file, args.magmoms.as_deref())?;
    let job_name = args
        .job_name
        .clone()
        .or_else(|| name.map(str::to_string))
        .unwrap_or_else(|| crystal.name.clone());

    let settings = SearchSettings::new(args.shell_tolerance)?;
    let structure = PeriodicStructure::new(crystal).with_settings(settings);
    let table = structure.neighbor_table(args.max_candidates)?;

    // 最后一个壳层可能被候选数截断，活跃壳层必须都在它之前
    let complete = complete_shells(&table);
    if args.couplings.len() > complete {
        return Err(CinolaError::IncompleteShells {
            requested: args.couplings.len(),
            complete,
            max_candidates: args.max_candidates,
        });
    }

    let topology = TopologyBuilder::new(&args.couplings)
        .policy(args.counting.into())
        .verify(args.verify)
        .build(&structure, &table)?;

    let config = solver_config(args, &job_name);
    let status = write_input_set(
        out_dir,
        &structure,
        &topology,
        &args.couplings,
        &config,
        args.overwrite,
    )?;

    Ok(Generated { topology, status })
}

/// 读取结构并应用命令行磁矩
fn load_structure(file: &Path, magmoms: Option<&str>) -> Result<Crystal> {
    let mut crystal = parsers::parse_structure_file(file)?;
    if crystal.atoms.is_empty() {
        return Err(CinolaError::ParseError {
            format: crystal.source_format.clone().unwrap_or_default(),
            path: file.display().to_string(),
            reason: "structure contains no atoms".to_string(),
        });
    }

    if let Some(text) = magmoms {
        let moments = parse_magmoms_for(text, crystal.atoms.len())?;
        crystal.set_magmoms(&moments);
    }

    Ok(crystal)
}

fn solver_config(args: &GenerateArgs, job_name: &str) -> SolverConfig {
    SolverConfig {
        max_spin_change: args.max_spin_change,
        steps_per_temperature: args.steps,
        prerelax_steps: args.prerelax_steps,
        t_low: args.temp_low,
        t_high: args.temp_high,
        t_step: args.temp_step,
        field: args.field,
        ..SolverConfig::default()
    }
    .with_job_name(job_name)
}

/// 写出批量汇总 CSV
fn write_summary(records: &[SummaryRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CinolaError::FileWriteError {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let mut wtr = csv::Writer::from_path(path)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush().map_err(|e| CinolaError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::writer::cinola::{JIJ_ASSIGN_FILE, MOMENTS_FILE, NEIGHBORS_FILE};

    use clap::Parser;
    use std::fs;
    use std::path::PathBuf;

    const BCC_POSCAR: &str = "Fe bcc
1.0
2.87 0.0 0.0
0.0 2.87 0.0
0.0 0.0 2.87
Fe
2
Direct
0.0 0.0 0.0
0.5 0.5 0.5
";

    const FCC_POSCAR: &str = "Ni fcc
1.0
3.52 0.0 0.0
0.0 3.52 0.0
0.0 0.0 3.52
Ni
4
Direct
0.0 0.0 0.0
0.5 0.5 0.0
0.5 0.0 0.5
0.0 0.5 0.5
";

    const SC_POSCAR: &str = "Po sc
1.0
2.0 0.0 0.0
0.0 2.0 0.0
0.0 0.0 2.0
Po
1
Direct
0.0 0.0 0.0
";

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cinolagen-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn generate_args(extra: &[&str]) -> GenerateArgs {
        let argv = [&["cinolagen", "generate"][..], extra].concat();
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Generate(args) => args,
            Commands::Shells(_) => unreachable!(),
        }
    }

    #[test]
    fn test_single_structure() {
        let dir = temp_dir("single");
        let input = dir.join("POSCAR");
        fs::write(&input, BCC_POSCAR).unwrap();
        let out = dir.join("out");

        let args = generate_args(&[
            input.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--couplings",
            "-0.02",
            "--magmoms",
            "2.2 -2.2",
            "--verify",
        ]);
        execute(args).unwrap();

        let neighbors = fs::read_to_string(out.join(NEIGHBORS_FILE)).unwrap();
        assert!(neighbors.starts_with("1\n8\n2 2 2 2 2 2 2 2\n"));
        let assign = fs::read_to_string(out.join(JIJ_ASSIGN_FILE)).unwrap();
        assert!(assign.ends_with("1 1 1 1 1 1 1 1\n"));
        let moments = fs::read_to_string(out.join(MOMENTS_FILE)).unwrap();
        assert_eq!(moments, "2\n2.2\n-2.2\n");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_single_structure_rejected() {
        let dir = temp_dir("rejected");
        let input = dir.join("POSCAR");
        fs::write(&input, BCC_POSCAR).unwrap();

        // bcc 前两个壳层为 8 和 6 个近邻
        let args = generate_args(&[
            input.to_str().unwrap(),
            "-o",
            dir.join("out").to_str().unwrap(),
            "--couplings",
            "1.0,0.5",
        ]);
        let err = execute(args).unwrap_err();
        assert!(matches!(err, CinolaError::StructuralInconsistency { .. }));
        assert!(!dir.join("out").join(NEIGHBORS_FILE).exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_truncated_shell_is_not_used() {
        let dir = temp_dir("truncated");
        let input = dir.join("POSCAR");
        fs::write(&input, SC_POSCAR).unwrap();
        let out = dir.join("out");

        // 12 个候选只装得下 6 个最近邻和一半的次近邻
        let args = generate_args(&[
            input.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "-J",
            "1.0,0.5",
            "--max-candidates",
            "12",
        ]);
        match execute(args).unwrap_err() {
            CinolaError::IncompleteShells {
                requested,
                complete,
                max_candidates,
            } => {
                assert_eq!(requested, 2);
                assert_eq!(complete, 1);
                assert_eq!(max_candidates, 12);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!out.join(NEIGHBORS_FILE).exists());

        // 只用完整的最近邻壳层可以生成
        let args = generate_args(&[
            input.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "-J",
            "1.0",
            "--max-candidates",
            "12",
        ]);
        execute(args).unwrap();
        let neighbors = fs::read_to_string(out.join(NEIGHBORS_FILE)).unwrap();
        assert!(neighbors.starts_with("1\n6\n1 1 1 1 1 1\n"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_shell_tolerance() {
        let dir = temp_dir("tolerance");
        let input = dir.join("POSCAR");
        fs::write(&input, SC_POSCAR).unwrap();
        let out = dir.join("out");

        let input = input.to_str().unwrap();
        let out_arg = out.to_str().unwrap();
        let cases = [
            ["--shell-tolerance", "nan"],
            ["--shell-tolerance=-0.1", "--overwrite"],
        ];
        for flags in cases {
            let argv = [&[input, "-o", out_arg, "-J", "1.0"][..], &flags[..]].concat();
            let args = generate_args(&argv);
            assert!(matches!(
                execute(args).unwrap_err(),
                CinolaError::InvalidArgument(_)
            ));
        }
        assert!(!out.exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_magmom_count_mismatch() {
        let dir = temp_dir("magmom");
        let input = dir.join("POSCAR");
        fs::write(&input, BCC_POSCAR).unwrap();

        let args = generate_args(&[
            input.to_str().unwrap(),
            "-o",
            dir.join("out").to_str().unwrap(),
            "--couplings",
            "1.0",
            "--magmoms",
            "3*2.2",
        ]);
        assert!(matches!(
            execute(args).unwrap_err(),
            CinolaError::InvalidMagmoms(_)
        ));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_batch_with_summary() {
        let dir = temp_dir("batch");
        let input = dir.join("structures");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("Fe.vasp"), BCC_POSCAR).unwrap();
        fs::write(input.join("Ni.vasp"), FCC_POSCAR).unwrap();
        fs::write(input.join("broken.vasp"), "not a poscar\n").unwrap();
        let out = dir.join("out");

        // 两个壳层：bcc 为 8/6 不一致，fcc 为 12/6 不一致；单壳层都可以
        let args = generate_args(&[
            input.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--couplings",
            "1.0",
            "--pattern",
            "*.vasp",
            "--jobs",
            "2",
        ]);
        execute(args).unwrap();

        assert!(out.join("Fe").join(NEIGHBORS_FILE).exists());
        assert!(out.join("Ni").join(NEIGHBORS_FILE).exists());
        assert!(!out.join("broken").exists());

        let fcc = fs::read_to_string(out.join("Ni").join(NEIGHBORS_FILE)).unwrap();
        assert!(fcc.starts_with("1\n12\n"));

        let summary = fs::read_to_string(out.join(SUMMARY_FILE)).unwrap();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "structure,atoms,shells,width,status,message");
        assert!(lines[1].starts_with("Fe,2,1,8,success"));
        assert!(lines[2].starts_with("Ni,4,1,12,success"));
        assert!(lines[3].starts_with("broken,0,0,0,failed"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_batch_rejects_inconsistent_structures() {
        let dir = temp_dir("batch-reject");
        let input = dir.join("structures");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("Fe.vasp"), BCC_POSCAR).unwrap();
        let out = dir.join("out");

        let args = generate_args(&[
            input.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--couplings",
            "1.0,0.5",
            "--pattern",
            "*.vasp",
        ]);
        execute(args).unwrap();

        let summary = fs::read_to_string(out.join(SUMMARY_FILE)).unwrap();
        assert!(summary.lines().nth(1).unwrap().starts_with("Fe,0,0,0,rejected"));
        assert!(!out.join("Fe").exists());

        let _ = fs::remove_dir_all(&dir);
    }
}
