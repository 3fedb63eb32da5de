//! Header/footer file carving over raw byte buffers.
//!
//! The carver prescans the buffer for header candidates with an Aho-Corasick
//! automaton built over the enabled catalog subset, then resolves candidates
//! in ascending offset order: footer search within the signature's size cap,
//! confidence per outcome, cursor jump past every accepted carve so output
//! ranges never overlap. The prescan is chunked so a cancellation token and
//! progress callback get serviced even on multi-hundred-MB images.

use crate::signatures::{CARVING_SIGNATURES, Category, FileSignature};
use aho_corasick::AhoCorasick;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// Carves shorter than this are discarded as degenerate matches.
const MIN_CARVE_BYTES: usize = 100;
/// Footer search starts this far past the header to skip trivial coincidences.
const FOOTER_SEARCH_SKIP: usize = 10;
const PRESCAN_CHUNK: usize = 4 * 1024 * 1024;

const CONFIDENCE_FOOTER_FOUND: u8 = 95;
const CONFIDENCE_SIZE_CAPPED: u8 = 50;
const CONFIDENCE_HEADER_ONLY: u8 = 60;

/// One recovered byte range. `offset + length` never exceeds the length of
/// the buffer it was carved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarvedFile {
    pub signature: &'static str,
    pub extension: &'static str,
    pub offset: usize,
    pub length: usize,
    pub confidence: u8,
    pub category: Category,
}

impl CarvedFile {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Shared flag checked at every prescan chunk boundary and every candidate.
/// Cancelling returns whatever was carved so far.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CarveProgress {
    pub scanned_bytes: u64,
    pub total_bytes: u64,
    /// Accepted carves so far. Zero while the header prescan is running.
    pub found: usize,
}

pub type ProgressFn<'a> = &'a dyn Fn(CarveProgress);

pub struct Carver {
    signatures: Vec<&'static FileSignature>,
    automaton: Option<AhoCorasick>,
    max_header_len: usize,
}

impl Carver {
    /// Builds a carver over the carving catalog filtered to `enabled`
    /// categories. An empty filter enables everything. Catalog order is
    /// preserved, so earlier-declared signatures still win shared prefixes.
    pub fn new(enabled: &[Category]) -> Self {
        let signatures: Vec<&'static FileSignature> = CARVING_SIGNATURES
            .iter()
            .filter(|sig| enabled.is_empty() || enabled.contains(&sig.category))
            .collect();

        let automaton = if signatures.is_empty() {
            None
        } else {
            AhoCorasick::new(signatures.iter().map(|sig| sig.header)).ok()
        };
        let max_header_len = signatures
            .iter()
            .map(|sig| sig.header.len())
            .max()
            .unwrap_or(0);

        Self {
            signatures,
            automaton,
            max_header_len,
        }
    }

    pub fn all() -> Self {
        Self::new(&[])
    }

    pub fn enabled_signatures(&self) -> &[&'static FileSignature] {
        &self.signatures
    }

    pub fn carve(&self, buffer: &[u8]) -> Vec<CarvedFile> {
        self.carve_with(buffer, None, None)
    }

    /// Full carve with optional progress reporting and cancellation.
    pub fn carve_with(
        &self,
        buffer: &[u8],
        progress: Option<ProgressFn<'_>>,
        cancel: Option<&CancelToken>,
    ) -> Vec<CarvedFile> {
        let candidates = self.prescan(buffer, progress, cancel);
        self.resolve(buffer, candidates, progress, cancel)
    }

    /// Like `carve`, but the header prescan fans out across the rayon pool.
    /// Output is identical to the sequential path; there are no yield points,
    /// so prefer `carve_with` when cancellation matters.
    pub fn carve_parallel(&self, buffer: &[u8]) -> Vec<CarvedFile> {
        let candidates = self.prescan_parallel(buffer);
        self.resolve(buffer, candidates, None, None)
    }

    /// Finds every header occurrence as `(offset, signature index)`, reduced
    /// to the earliest-declared signature per offset.
    fn prescan(
        &self,
        buffer: &[u8],
        progress: Option<ProgressFn<'_>>,
        cancel: Option<&CancelToken>,
    ) -> Vec<(usize, usize)> {
        let Some(automaton) = &self.automaton else {
            return Vec::new();
        };

        let overlap = self.max_header_len.saturating_sub(1);
        let mut candidates = Vec::new();
        let mut base = 0usize;

        while base < buffer.len() {
            if cancel.is_some_and(|token| token.is_cancelled()) {
                debug!(offset = base, "carve prescan cancelled");
                break;
            }

            let chunk_end = (base + PRESCAN_CHUNK).min(buffer.len());
            // The window extends into the next chunk so headers straddling
            // the boundary are still seen; matches owned by the next chunk
            // are dropped to avoid duplicates.
            let window_end = (chunk_end + overlap).min(buffer.len());
            for m in automaton.find_overlapping_iter(&buffer[base..window_end]) {
                let offset = base + m.start();
                if offset < chunk_end {
                    candidates.push((offset, m.pattern().as_usize()));
                }
            }

            if let Some(report) = progress {
                report(CarveProgress {
                    scanned_bytes: chunk_end as u64,
                    total_bytes: buffer.len() as u64,
                    found: 0,
                });
            }
            base = chunk_end;
        }

        finish_candidates(candidates)
    }

    fn prescan_parallel(&self, buffer: &[u8]) -> Vec<(usize, usize)> {
        let Some(automaton) = &self.automaton else {
            return Vec::new();
        };

        let overlap = self.max_header_len.saturating_sub(1);
        let chunks = buffer.len().div_ceil(PRESCAN_CHUNK);
        let candidates: Vec<(usize, usize)> = (0..chunks)
            .into_par_iter()
            .map(|index| {
                let base = index * PRESCAN_CHUNK;
                let chunk_end = (base + PRESCAN_CHUNK).min(buffer.len());
                let window_end = (chunk_end + overlap).min(buffer.len());
                automaton
                    .find_overlapping_iter(&buffer[base..window_end])
                    .map(|m| (base + m.start(), m.pattern().as_usize()))
                    .filter(|&(offset, _)| offset < chunk_end)
                    .collect::<Vec<_>>()
            })
            .reduce(Vec::new, |mut acc, mut chunk| {
                acc.append(&mut chunk);
                acc
            });

        finish_candidates(candidates)
    }

    fn resolve(
        &self,
        buffer: &[u8],
        candidates: Vec<(usize, usize)>,
        progress: Option<ProgressFn<'_>>,
        cancel: Option<&CancelToken>,
    ) -> Vec<CarvedFile> {
        debug!(
            candidates = candidates.len(),
            bytes = buffer.len(),
            "resolving carve candidates"
        );

        let mut carved = Vec::new();
        let mut cursor = 0usize;

        for (offset, sig_index) in candidates {
            if cancel.is_some_and(|token| token.is_cancelled()) {
                debug!(offset, carved = carved.len(), "carve resolution cancelled");
                break;
            }
            // Inside a region already carved out.
            if offset < cursor {
                continue;
            }

            let sig = self.signatures[sig_index];
            let Some(file) = carve_candidate(buffer, offset, sig) else {
                continue;
            };
            cursor = file.end();
            carved.push(file);

            if let Some(report) = progress {
                report(CarveProgress {
                    scanned_bytes: buffer.len() as u64,
                    total_bytes: buffer.len() as u64,
                    found: carved.len(),
                });
            }
        }

        carved
    }
}

/// Sorts candidates and keeps only the earliest-declared signature at each
/// offset: the catalog-order tie-break.
fn finish_candidates(mut candidates: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    candidates.sort_unstable();
    candidates.dedup_by_key(|&mut (offset, _)| offset);
    candidates
}

fn carve_candidate(
    buffer: &[u8],
    offset: usize,
    sig: &'static FileSignature,
) -> Option<CarvedFile> {
    let available = buffer.len() - offset;
    let max_size = usize::try_from(sig.max_size).unwrap_or(usize::MAX);

    let (length, confidence) = match sig.footer {
        Some(footer) => match find_footer(buffer, offset, footer, max_size) {
            Some(end) => (end - offset, CONFIDENCE_FOOTER_FOUND),
            None => (max_size.min(available), CONFIDENCE_SIZE_CAPPED),
        },
        None => (max_size.min(available), CONFIDENCE_HEADER_ONLY),
    };

    if length <= MIN_CARVE_BYTES || length >= max_size {
        trace!(offset, length, signature = sig.name, "candidate discarded");
        return None;
    }

    Some(CarvedFile {
        signature: sig.name,
        extension: sig.extension(),
        offset,
        length,
        confidence,
        category: sig.category,
    })
}

/// Searches `[offset + FOOTER_SEARCH_SKIP, offset + max_size)` for the footer
/// and returns the absolute end of the carve (footer inclusive).
fn find_footer(buffer: &[u8], offset: usize, footer: &[u8], max_size: usize) -> Option<usize> {
    let from = offset.checked_add(FOOTER_SEARCH_SKIP)?;
    let to = offset.saturating_add(max_size).min(buffer.len());
    if from >= to {
        return None;
    }

    buffer[from..to]
        .windows(footer.len())
        .position(|window| window == footer)
        .map(|pos| from + pos + footer.len())
}

/// Convenience wrapper: carve with a throwaway `Carver` over the given
/// categories (empty = all).
pub fn carve(buffer: &[u8], enabled: &[Category]) -> Vec<CarvedFile> {
    Carver::new(enabled).carve(buffer)
}
