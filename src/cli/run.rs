use crate::cli::args::{Cli, Commands, RunArgs};
use anyhow::{Context, Result, bail};
use clap::Parser;
use readqc::core::config::{ConfigSources, QcConfig};
use readqc::core::engine::{self, RunConfig};
use readqc::report;
use std::fs;
use std::time::Instant;
use tracing::{debug, info};

pub fn entry() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => {
            init_logging(&args);
            run(args)
        }
    }
}

fn init_logging(args: &RunArgs) {
    let level = if args.quiet {
        tracing::Level::ERROR
    } else if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(args: RunArgs) -> Result<()> {
    let t0 = Instant::now();

    for input in &args.inputs {
        if input.as_os_str() == "-" {
            bail!("stdin is not supported; provide a FASTQ file path");
        }
        if !input.is_file() {
            bail!("input file not found: {}", input.display());
        }
    }
    if args.threads == 0 {
        bail!("--threads must be >= 1");
    }

    let qc = QcConfig::load(&ConfigSources {
        limits: args.limits.as_deref(),
        adapters: args.adapters.as_deref(),
        contaminants: args.contaminants.as_deref(),
        kmer_size: args.kmer_size,
        nogroup: args.nogroup,
    })
    .with_context(|| "failed to load configuration")?;

    fs::create_dir_all(&args.outdir)
        .with_context(|| format!("failed to create output dir {}", args.outdir.display()))?;

    let config = RunConfig {
        inputs: args.inputs,
        threads: args.threads,
        qc,
    };
    let reports = engine::run(&config)?;

    for file_report in &reports {
        let t_write = Instant::now();
        report::write_all(&args.outdir, file_report, !args.no_zip)
            .with_context(|| format!("failed to write reports for {}", file_report.path.display()))?;
        debug!(file = %file_report.file_name, stage = "reports", elapsed = ?t_write.elapsed(), "stage finished");
    }

    info!(files = reports.len(), elapsed = ?t0.elapsed(), "run finished");
    Ok(())
}
