//! Run tests with kernel-log classification.
//!
//! ```bash
//! # Run one test; prints its JSON result
//! dmesg-lens run --name gem_exec_basic -- ./gem_exec_basic --run-subtest basic
//!
//! # Run every command listed in a file, one per line
//! dmesg-lens batch tests.txt
//!
//! # Check that the kernel log can be read at all
//! dmesg-lens snapshot
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use dmesg_lens::config::Config;
use dmesg_lens::runner::{DmesgMonitor, process};
use dmesg_lens::{RunSummary, TestResult, Verdict, dmesg};

#[derive(Parser)]
#[command(name = "dmesg-lens")]
#[command(about = "Classify test results against new kernel log messages")]
#[command(version)]
struct Cli {
    /// Directory holding dmesg-lens.toml (defaults to the current directory).
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single test command.
    Run {
        /// Name recorded in the result (defaults to the command line).
        #[arg(short, long)]
        name: Option<String>,

        /// Per-test timeout in seconds, overriding the config file.
        #[arg(short, long)]
        timeout: Option<u64>,

        /// The test command and its arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Run each command listed in a file, one per line.
    ///
    /// Blank lines and lines starting with '#' are ignored.
    Batch {
        /// File with one shell-quoted command per line.
        file: PathBuf,

        /// Per-test timeout in seconds, overriding the config file.
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Print the current kernel log as the configured source sees it.
    Snapshot,
}

#[derive(Serialize)]
struct NamedResult<'a> {
    name: &'a str,
    #[serde(flatten)]
    result: &'a TestResult,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let dir = match cli.config_dir {
        Some(dir) => dir,
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let config = Config::load(&dir);

    match cli.command {
        Commands::Run {
            name,
            timeout,
            command,
        } => {
            let monitor = monitor(&config).await;
            let limit = test_timeout(timeout, &config);
            let name = name.unwrap_or_else(|| shell_words::join(&command));
            let result = monitor.run_command(&command, limit).await?;
            print_result(&name, &result)?;
        }
        Commands::Batch { file, timeout } => {
            let commands = read_batch(&file)?;
            let monitor = monitor(&config).await;
            let limit = test_timeout(timeout, &config);
            let summary = run_batch(&monitor, &commands, limit).await?;
            let worst = summary.worst.map_or("-", |v| v.as_str());
            eprintln!(
                "{} tests, {} passed ({:.1}%), {} skipped, {} escalated by kernel log, worst {}, {} ms",
                summary.total,
                summary.passed,
                summary.pass_rate() * 100.0,
                summary.skipped,
                summary.escalated,
                worst,
                summary.duration
            );
        }
        Commands::Snapshot => {
            let source = dmesg::detect(&config.dmesg).await;
            let snapshot = tokio::time::timeout(config.dmesg.capture_timeout(), source.capture())
                .await
                .context("kernel log capture timed out")?
                .with_context(|| format!("failed to read kernel log via {}", source.name()))?;
            for line in snapshot.lines() {
                println!("{line}");
            }
        }
    }

    Ok(())
}

async fn monitor(config: &Config) -> DmesgMonitor {
    let source = dmesg::detect(&config.dmesg).await;
    let monitor = DmesgMonitor::new(source, config.dmesg.capture_timeout());
    if !monitor.is_active() {
        log::warn!("kernel log inactive; verdicts are reported as the tests gave them");
    }
    monitor
}

fn test_timeout(flag: Option<u64>, config: &Config) -> Option<Duration> {
    flag.or(config.runner.timeout_secs).map(Duration::from_secs)
}

fn read_batch(path: &Path) -> Result<Vec<Vec<String>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            shell_words::split(line)
                .with_context(|| format!("{}:{}: invalid command", path.display(), i + 1))
        })
        .collect()
}

async fn run_batch(
    monitor: &DmesgMonitor,
    commands: &[Vec<String>],
    limit: Option<Duration>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for command in commands {
        let name = shell_words::join(command);
        let mut raw = Verdict::NotRun;
        let raw_slot = &mut raw;
        let result = monitor
            .run_bracketed(|| async move {
                let result = process::run_command(command, limit).await?;
                *raw_slot = result.verdict;
                Ok(result)
            })
            .await;
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                log::error!("{name}: {e:#}");
                raw = Verdict::Fail;
                TestResult {
                    info: Some(format!("{e:#}")),
                    ..TestResult::new(Verdict::Fail)
                }
            }
        };
        summary.record(raw, &result);
        print_result(&name, &result)?;
    }
    Ok(summary)
}

fn print_result(name: &str, result: &TestResult) -> Result<()> {
    let line = serde_json::to_string(&NamedResult { name, result })
        .context("failed to serialize result")?;
    println!("{line}");
    log::info!("{} {} {}", result.verdict.icon(), result.verdict, name);
    Ok(())
}
