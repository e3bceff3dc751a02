use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use sysperf::cli::{Cli, Command};
use sysperf::report::{BenchmarkReport, ReportFormat};
use sysperf::{engine, harness, map_bench, memory};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_report<P>(report: &BenchmarkReport<P>, format: ReportFormat) -> Result<()>
where
    P: serde::Serialize + std::fmt::Display,
{
    let rendered = report
        .render(format)
        .context("Failed to serialize report")?;
    println!("{}", rendered);
    Ok(())
}

/// Run the selected benchmark and print its report
fn run(args: Cli) -> Result<()> {
    init_tracing(args.debug);

    if let Some(cpu) = args.cpu {
        harness::pin_to_cpu(cpu)?;
    }

    match args.command {
        Command::File(file) => {
            let config = file.to_config()?;
            let result = engine::run_file_benchmark(&config)
                .with_context(|| format!("file benchmark on {} failed", config.target().display()))?;
            print_report(&BenchmarkReport::new("file", config, &[result]), args.format)?;
        }
        Command::Append(append) => {
            let append = append.to_config();
            let config = append.to_workload()?;
            tracing::info!("{}", append);
            let result = engine::run_file_benchmark(&config)
                .with_context(|| format!("append benchmark on {} failed", config.target().display()))?;
            print_report(&BenchmarkReport::new("append", config, &[result]), args.format)?;
        }
        Command::Mem(mem) => {
            let config = mem.to_config();
            let results = memory::run_memory_benchmark(&config).context("memory benchmark failed")?;
            print_report(&BenchmarkReport::new("mem", config, &results), args.format)?;
        }
        Command::Map(map) => {
            let config = map.to_config();
            let results = map_bench::run_map_benchmark(&config).context("map benchmark failed")?;
            print_report(&BenchmarkReport::new("map", config, &results), args.format)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // clap exits with 2 on usage errors; every failure of this tool exits with 1
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
