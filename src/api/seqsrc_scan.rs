//! Parallel scan over a sequence source
//!
//! The collection is split into contiguous oid ranges, one per worker. Each
//! worker takes its own copy of the source and its own bounded iterator, so
//! the only shared state is the progress bar.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::core::blast_seqsrc::{BlastSeqSrc, Oid, SeqSrcError};
use crate::core::blast_seqsrc_iterator::SeqSrcIterator;
use crate::utils::matrix::BLASTAA_SIZE;

/// Residue codes counted by the scan (NCBISTDAA covers BLASTNA too)
const NUM_CODES: usize = BLASTAA_SIZE;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Oids fetched per iterator refill; 0 selects the default
    pub chunk_size: usize,
    pub num_workers: usize,
    pub show_progress: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            chunk_size: 0,
            num_workers: 1,
            show_progress: false,
        }
    }
}

/// What one worker saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    pub first_oid: Oid,
    pub end_oid: Oid,
    pub sequences: usize,
    pub residues: u64,
    pub refills: usize,
}

#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub num_seqs: usize,
    pub tot_len: u64,
    /// Residue counts indexed by encoded letter
    pub counts: [u64; NUM_CODES],
    pub workers: Vec<WorkerSummary>,
}

impl ScanSummary {
    /// Residue counts as fractions of all residues
    pub fn frequencies(&self) -> [f64; NUM_CODES] {
        let mut freqs = [0.0; NUM_CODES];
        if self.tot_len > 0 {
            for (f, &n) in freqs.iter_mut().zip(self.counts.iter()) {
                *f = n as f64 / self.tot_len as f64;
            }
        }
        freqs
    }
}

/// Split `[0, num_seqs)` into at most `parts` contiguous ranges
fn partition(num_seqs: usize, parts: usize) -> Vec<(Oid, Oid)> {
    let parts = parts.clamp(1, num_seqs.max(1));
    let base = num_seqs / parts;
    let extra = num_seqs % parts;
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0usize;
    for i in 0..parts {
        let len = base + usize::from(i < extra);
        ranges.push((start as Oid, (start + len) as Oid));
        start += len;
    }
    ranges
}

fn scan_range(
    src: &BlastSeqSrc,
    range: (Oid, Oid),
    chunk_size: usize,
    bar: &ProgressBar,
) -> Result<(WorkerSummary, [u64; NUM_CODES]), SeqSrcError> {
    let local = src.copy();
    let mut itr = SeqSrcIterator::with_range(chunk_size, range.0, Some(range.1));
    let mut counts = [0u64; NUM_CODES];
    let mut summary = WorkerSummary {
        first_oid: range.0,
        end_oid: range.1,
        sequences: 0,
        residues: 0,
        refills: 0,
    };

    while let Some(oid) = local.iterator_next(&mut itr) {
        let seq = local.get_sequence(oid)?;
        for &r in seq.sequence() {
            if let Some(slot) = counts.get_mut(r as usize) {
                *slot += 1;
            }
        }
        summary.sequences += 1;
        summary.residues += seq.length() as u64;
        local.release_sequence(seq);
        bar.inc(1);
    }
    summary.refills = itr.refills();
    Ok((summary, counts))
}

/// Count residues of every sequence in `src` using `options.num_workers`
/// workers on the current rayon pool
pub fn scan_composition(src: &BlastSeqSrc, options: &ScanOptions) -> Result<ScanSummary, SeqSrcError> {
    let num_seqs = src.num_seqs();
    let ranges = partition(num_seqs, options.num_workers);
    log::debug!(
        "Scanning {} sequences of {} with {} workers",
        num_seqs,
        src.name(),
        ranges.len()
    );

    let bar = if options.show_progress {
        let bar = ProgressBar::new(num_seqs as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
        {
            bar.set_style(style);
        }
        bar
    } else {
        ProgressBar::hidden()
    };

    let results: Vec<(WorkerSummary, [u64; NUM_CODES])> = ranges
        .par_iter()
        .map(|&range| scan_range(src, range, options.chunk_size, &bar))
        .collect::<Result<_, _>>()?;
    bar.finish_and_clear();

    let mut counts = [0u64; NUM_CODES];
    let mut workers = Vec::with_capacity(results.len());
    for (summary, worker_counts) in results {
        for (total, n) in counts.iter_mut().zip(worker_counts.iter()) {
            *total += n;
        }
        workers.push(summary);
    }
    let tot_len = workers.iter().map(|w| w.residues).sum();
    Ok(ScanSummary {
        num_seqs: workers.iter().map(|w| w.sequences).sum(),
        tot_len,
        counts,
        workers,
    })
}
