//! Streaming quality control for sequencing reads in FASTQ files.
//!
//! Reads are folded into a bounded-memory [`core::stats::Snapshot`]; the
//! analysis modules in [`core::metrics`] grade it and render FastQC-style
//! text, summary and HTML reports (see [`report`]).

pub mod core;
pub mod report;
