// ========================================================================================
//                          Delimited-input readers & discovery
// ========================================================================================
//
// Everything that turns files into records lives here: the tab-delimited
// cohort segment reader, the comma-delimited gene annotation reader, and the
// input-directory scan. Columns are resolved by header name, never by
// position, because the upstream exports carry extra columns in varying
// order.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use crate::types::{Gene, Segment, SegmentError, parse_chromosome_label};

/// Files the input-directory scan never treats as cohort data.
const EXCLUDED_FILES: &[&str] = &["MANIFEST.txt"];

#[derive(Debug, Error)]
pub enum CohortError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("'{}' is missing required column '{column}'", path.display())]
    MissingColumn {
        path: PathBuf,
        column: &'static str,
    },
    #[error("malformed row in '{}' at line {line}: {message}", path.display())]
    MalformedRow {
        path: PathBuf,
        line: u64,
        message: String,
    },
    #[error("invalid segment in '{}' at line {line}: {source}", path.display())]
    InvalidSegment {
        path: PathBuf,
        line: u64,
        #[source]
        source: SegmentError,
    },
}

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("failed to read annotation '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse annotation '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("annotation '{}' is missing required column '{column}'", path.display())]
    MissingColumn {
        path: PathBuf,
        column: &'static str,
    },
}

/// Reads one cohort segment file. Sample identifiers are returned as-is; the
/// caller decides about filtering and normalization. Any malformed row aborts
/// the whole cohort: a partial index over corrupted input must never reach
/// the output stage.
pub fn read_segments(path: &Path) -> Result<Vec<Segment>, CohortError> {
    let file = File::open(path).map_err(|source| CohortError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| CohortError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let sample_col = required_column(&headers, path, "Sample")?;
    let chromosome_col = required_column(&headers, path, "Chromosome")?;
    let start_col = required_column(&headers, path, "Start")?;
    let end_col = required_column(&headers, path, "End")?;
    let mean_col = required_column(&headers, path, "Segment_Mean")?;

    let mut segments = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| CohortError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record.position().map_or(0, |p| p.line());

        let sample = record_field(&record, sample_col, "Sample", path, line)?;
        let chromosome = record_field(&record, chromosome_col, "Chromosome", path, line)?;
        let start: u64 = parse_number(
            record_field(&record, start_col, "Start", path, line)?,
            "Start",
            path,
            line,
        )?;
        let end: u64 = parse_number(
            record_field(&record, end_col, "End", path, line)?,
            "End",
            path,
            line,
        )?;
        let mean: f64 = parse_number(
            record_field(&record, mean_col, "Segment_Mean", path, line)?,
            "Segment_Mean",
            path,
            line,
        )?;

        let segment = Segment::new(sample.to_string(), chromosome, start, end, mean).map_err(
            |source| CohortError::InvalidSegment {
                path: path.to_path_buf(),
                line,
                source,
            },
        )?;
        segments.push(segment);
    }
    Ok(segments)
}

/// Loads the gene annotation. Rows without a usable chromosome or start
/// position (unplaced genes, header cruft) are expected in real annotation
/// exports and are skipped, not fatal.
pub fn read_annotation(path: &Path) -> Result<Vec<Gene>, AnnotationError> {
    let file = File::open(path).map_err(|source| AnnotationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| AnnotationError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let symbol_col = annotation_column(&headers, path, "Approved Symbol")?;
    let chromosome_col = annotation_column(&headers, path, "Chromosome")?;
    let start_col = annotation_column(&headers, path, "txStart")?;

    let mut genes = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        let record = result.map_err(|source| AnnotationError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let symbol = match record.get(symbol_col) {
            Some(symbol) if !symbol.is_empty() => symbol,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let chromosome = match record.get(chromosome_col).map(parse_chromosome_label) {
            Some(Ok(chromosome)) => chromosome,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let start = match record.get(start_col).and_then(|raw| raw.parse::<u64>().ok()) {
            Some(start) => start,
            None => {
                skipped += 1;
                continue;
            }
        };

        genes.push(Gene {
            symbol: symbol.to_string(),
            chromosome,
            start,
        });
    }

    if skipped > 0 {
        log::info!(
            "annotation '{}': skipped {skipped} rows without a usable chromosome or txStart",
            path.display()
        );
    }
    Ok(genes)
}

/// Lists the cohort files in the input directory, sorted by name so
/// scheduling order is deterministic. Dot-files, manifests, and
/// subdirectories are not data.
pub fn discover_cohorts(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || EXCLUDED_FILES.contains(&name.as_ref()) {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

/// Cohort label for output naming: the file name up to the first dot
/// (`BRCA.snp__seg.txt` labels the `BRCA` cohort).
pub fn cohort_label(path: &Path) -> String {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return String::new(),
    };
    match name.split('.').next() {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => name.into_owned(),
    }
}

fn required_column(
    headers: &StringRecord,
    path: &Path,
    column: &'static str,
) -> Result<usize, CohortError> {
    headers
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| CohortError::MissingColumn {
            path: path.to_path_buf(),
            column,
        })
}

fn annotation_column(
    headers: &StringRecord,
    path: &Path,
    column: &'static str,
) -> Result<usize, AnnotationError> {
    headers
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| AnnotationError::MissingColumn {
            path: path.to_path_buf(),
            column,
        })
}

fn record_field<'r>(
    record: &'r StringRecord,
    index: usize,
    column: &'static str,
    path: &Path,
    line: u64,
) -> Result<&'r str, CohortError> {
    record.get(index).ok_or_else(|| CohortError::MalformedRow {
        path: path.to_path_buf(),
        line,
        message: format!("missing field '{column}'"),
    })
}

fn parse_number<T: FromStr>(
    raw: &str,
    column: &'static str,
    path: &Path,
    line: u64,
) -> Result<T, CohortError> {
    raw.parse().map_err(|_| CohortError::MalformedRow {
        path: path.to_path_buf(),
        line,
        message: format!("field '{column}' has unparseable value '{raw}'"),
    })
}
