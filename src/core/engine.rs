use crate::core::config::QcConfig;
use crate::core::io;
use crate::core::metrics::{Module, build_modules, summarize_all};
use crate::core::model::Read;
use crate::core::stats::Accumulator;
use anyhow::{Context, Result, anyhow};
use crossbeam_channel as channel;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

/// Extensions stripped from a file name to get the sample name, outermost
/// first.
const STRIPPED_EXTENSIONS: [&str; 5] = [".gz", ".bz2", ".txt", ".fastq", ".fq"];

pub struct RunConfig {
    pub inputs: Vec<PathBuf>,
    pub threads: usize,
    pub qc: QcConfig,
}

/// Everything the report writers need for one input file.
pub struct FileReport {
    pub path: PathBuf,
    pub file_name: String,
    pub sample_name: String,
    pub num_reads: u64,
    pub modules: Vec<Module>,
}

pub fn sample_name(file_name: &str) -> String {
    let mut name = file_name;
    for ext in STRIPPED_EXTENSIONS {
        if let Some(stem) = name.strip_suffix(ext)
            && !stem.is_empty()
        {
            name = stem;
        }
    }
    name.to_string()
}

/// Streams one FASTQ file into a fresh accumulator and summarizes every
/// enabled module against the finished snapshot.
pub fn analyze_file(path: &Path, qc: &QcConfig, threads: usize) -> Result<FileReport> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .context("failed to determine input filename")?;
    info!(file = %path.display(), "analysis started");

    let t_read = Instant::now();
    let mut acc = Accumulator::new(qc.kmer_size);
    let mut qual = Vec::new();
    let num_reads = io::for_each_record(path, threads, |view| {
        view.phred_into(&mut qual);
        acc.observe(&Read {
            seq: view.seq,
            qual: &qual,
            tile: view.tile(),
        });
    })?;
    log_stage(&file_name, "read", t_read);

    let t_summary = Instant::now();
    let snap = acc.finalize();
    let mut modules = build_modules(qc, &file_name);
    summarize_all(&mut modules, &snap)
        .with_context(|| format!("failed to summarize {}", path.display()))?;
    log_stage(&file_name, "summarize", t_summary);
    info!(file = %file_name, reads = num_reads, "analysis finished");

    Ok(FileReport {
        path: path.to_path_buf(),
        sample_name: sample_name(&file_name),
        file_name,
        num_reads,
        modules,
    })
}

/// Analyzes every input, several files at a time. Reports come back in input
/// order; the first failing file aborts the run.
pub fn run(cfg: &RunConfig) -> Result<Vec<FileReport>> {
    let t_total = Instant::now();
    let total = cfg.inputs.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    let workers = cfg.threads.clamp(1, total);
    let per_file_threads = (cfg.threads / workers).max(1);
    debug!(workers, per_file_threads, files = total, "engine configured");

    let (job_tx, job_rx) = channel::bounded::<(usize, &Path)>(workers * 2);
    let (result_tx, result_rx) = channel::unbounded::<(usize, Result<FileReport>)>();

    let mut parts: Vec<Option<FileReport>> = (0..total).map(|_| None).collect();
    thread::scope(|s| -> Result<()> {
        s.spawn(move || {
            for (index, path) in cfg.inputs.iter().enumerate() {
                if job_tx.send((index, path.as_path())).is_err() {
                    return;
                }
            }
        });

        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = result_tx.clone();
            let qc = &cfg.qc;
            s.spawn(move || {
                for (index, path) in rx.iter() {
                    let report = analyze_file(path, qc, per_file_threads);
                    let failed = report.is_err();
                    if tx.send((index, report)).is_err() || failed {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);
        // Owned here so an early return disconnects the workers.
        let result_rx = result_rx;

        for _ in 0..total {
            let (index, report) = result_rx
                .recv()
                .map_err(|_| anyhow!("worker exited before finishing all inputs"))?;
            let slot = parts
                .get_mut(index)
                .ok_or_else(|| anyhow!("invalid input index {}", index))?;
            *slot = Some(report?);
        }
        Ok(())
    })?;
    log_stage("all", "total", t_total);

    Ok(parts.into_iter().flatten().collect())
}

fn log_stage(file: &str, stage: &str, t: Instant) {
    debug!(file, stage, elapsed = ?t.elapsed(), "stage finished");
}
