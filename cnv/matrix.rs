// ========================================================================================
//                         Gene-matrix assembly & streamed output
// ========================================================================================
//
// One row per gene, one column per patient, streamed straight to disk. The
// cohort matrices run to hundreds of megabytes, so the table is never built
// in memory: each row is formatted into a reusable buffer and written as it
// is produced.
//
// The output lands on a temporary file that is renamed into place only after
// a successful flush: a failed cohort leaves nothing behind.

use std::fmt::Write as FmtWrite;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use log::warn;

use crate::index::CohortIndex;
use crate::io::CohortError;
use crate::types::{CHROMOSOME_SLOTS, Gene, QueryResult};

/// Textual marker for a position with no resolvable copy-number value.
pub const MISSING_VALUE: &str = "NaN";

/// Assembles and writes one cohort's matrix to `out_path`.
pub fn write_matrix(
    out_path: &Path,
    genes: &[Gene],
    index: &CohortIndex,
) -> Result<(), CohortError> {
    let temp_path = out_path.with_extension("csv.tmp");
    let file = File::create(&temp_path).map_err(|source| CohortError::Io {
        path: temp_path.clone(),
        source,
    })?;

    let write_result = (|| -> io::Result<()> {
        let mut writer = BufWriter::new(file);
        write_rows(&mut writer, genes, index)?;
        let file = writer.into_inner().map_err(io::Error::other)?;
        file.sync_all()
    })();

    if let Err(source) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(CohortError::Io {
            path: out_path.to_path_buf(),
            source,
        });
    }

    fs::rename(&temp_path, out_path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        CohortError::Io {
            path: out_path.to_path_buf(),
            source,
        }
    })
}

/// Streams the header and one row per gene. Patient columns follow the
/// cohort's fixed lexicographic order; every row is emitted in annotation
/// order, so identical inputs produce byte-identical output.
fn write_rows<W: Write>(writer: &mut W, genes: &[Gene], index: &CohortIndex) -> io::Result<()> {
    let patients = index.sorted_patient_ids();

    write!(writer, "Symbol,Chromosome,Location")?;
    for patient in &patients {
        write!(writer, ",{patient}")?;
    }
    writeln!(writer)?;

    let mut line = String::with_capacity(64 + patients.len() * 8);
    let mut float_buffer = ryu::Buffer::new();
    for gene in genes {
        // The annotation reader already dropped unplaceable genes; enforce the
        // slot bounds again here rather than trust the caller.
        if gene.chromosome as usize == 0 || gene.chromosome as usize >= CHROMOSOME_SLOTS {
            continue;
        }

        line.clear();
        // The leading quote keeps spreadsheets from reinterpreting gene
        // symbols that look like dates (SEPT1, MARCH5, ...).
        write!(&mut line, "'{},{},{}", gene.symbol, gene.chromosome, gene.start).unwrap();

        for &patient in &patients {
            let rendered = match index.resolve(patient, gene.chromosome, gene.start) {
                QueryResult::Value(value) => float_buffer.format(value),
                QueryResult::Missing => MISSING_VALUE,
                QueryResult::Ambiguous(covering) => {
                    warn!(
                        "ambiguous coverage for patient {patient} at gene {} (chr{} pos {}): {}",
                        gene.symbol,
                        gene.chromosome,
                        gene.start,
                        covering.iter().join(", ")
                    );
                    MISSING_VALUE
                }
            };
            line.push(',');
            line.push_str(rendered);
        }
        writeln!(writer, "{line}")?;
    }
    writer.flush()
}
