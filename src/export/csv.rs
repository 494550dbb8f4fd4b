use crate::error::Result;
use crate::types::SequenceSummary;
use csv::WriterBuilder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

pub const CSV_HEADER: [&str; 3] = ["accession", "length", "description"];

/// Write summaries to `path` as CSV; the header is present even with no rows.
pub fn write_summaries<P: AsRef<Path>>(path: P, summaries: &[SequenceSummary]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_to(BufWriter::new(file), summaries)?;
    info!(rows = summaries.len(), path = %path.display(), "CSV written");
    Ok(())
}

pub fn write_to<W: Write>(writer: W, summaries: &[SequenceSummary]) -> Result<()> {
    // Header written by hand: serde only emits one once a row exists
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for summary in summaries {
        wtr.serialize(summary)?;
    }
    wtr.flush()?;
    Ok(())
}
