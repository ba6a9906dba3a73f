// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are used
// in one file.

use std::fmt;
use thiserror::Error;

/// Number of chromosome slots per patient. Slot 0 is permanently unused so a
/// chromosome number indexes its slot directly; 1-22 are the autosomes and
/// slot 23 holds X.
pub const CHROMOSOME_SLOTS: usize = 24;

/// The slot number assigned to chromosome X.
pub const CHR_X: u8 = 23;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("{0}")]
    InvalidChromosome(String),
    #[error("inverted range {start}..{end} for sample '{sample}'")]
    InvertedRange { sample: String, start: u64, end: u64 },
}

pub fn parse_chromosome_label(chr_str: &str) -> Result<u8, String> {
    let mut trimmed = chr_str.trim();

    if trimmed.len() >= 3 && trimmed[..3].eq_ignore_ascii_case("chr") {
        trimmed = &trimmed[3..];
    }

    if trimmed.eq_ignore_ascii_case("X") {
        return Ok(CHR_X);
    }

    match trimmed.parse::<u8>() {
        Ok(n) if (1..=CHR_X).contains(&n) => Ok(n),
        _ => Err(format!(
            "Invalid chromosome label '{}'. Expected 1-22, 'X', or a 'chr' prefix.",
            chr_str.trim()
        )),
    }
}

/// One called copy-number segment for one sample. The genomic range is closed:
/// `start` and `end` are both covered positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub patient_id: String,
    pub chromosome: u8,
    pub start: u64,
    pub end: u64,
    pub value: f64,
}

impl Segment {
    pub fn new(
        patient_id: String,
        chromosome: &str,
        start: u64,
        end: u64,
        value: f64,
    ) -> Result<Self, SegmentError> {
        let chromosome =
            parse_chromosome_label(chromosome).map_err(SegmentError::InvalidChromosome)?;
        if start > end {
            return Err(SegmentError::InvertedRange {
                sample: patient_id,
                start,
                end,
            });
        }
        Ok(Self {
            patient_id,
            chromosome,
            start,
            end,
            value,
        })
    }
}

/// A gene with a queryable location. Annotation rows without one never become
/// a `Gene`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gene {
    pub symbol: String,
    pub chromosome: u8,
    pub start: u64,
}

/// One segment found to cover a queried position, with its closed bounds
/// restored for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Covering {
    pub start: u64,
    pub end: u64,
    pub value: f64,
}

impl fmt::Display for Covering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]={}", self.start, self.end, self.value)
    }
}

/// Outcome of a point query against one patient's chromosome index.
///
/// `Ambiguous` carries every covering segment: more than one call at a
/// position is a data-quality condition that must be surfaced, never resolved
/// by picking or averaging.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Value(f64),
    Missing,
    Ambiguous(Vec<Covering>),
}
