use crate::error::{Result, RetrieverError};
use crate::types::SequenceSummary;
use gb_io::reader::SeqReader;
use gb_io::seq::Seq;
use tracing::debug;

/// Parse every record in a GenBank flat-file body into summaries, in file order.
pub fn parse_genbank(body: &[u8]) -> Result<Vec<SequenceSummary>> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Vec::new());
    }

    let mut summaries = Vec::new();
    for (index, record) in SeqReader::new(body).enumerate() {
        let seq = record.map_err(|e| {
            RetrieverError::Parse(format!("record {} of batch: {}", index + 1, e))
        })?;
        summaries.push(summarize(&seq));
    }
    debug!(records = summaries.len(), "parsed GenBank batch");
    Ok(summaries)
}

pub fn summarize(seq: &Seq) -> SequenceSummary {
    SequenceSummary {
        accession: accession(seq),
        length: sequence_length(seq),
        description: description(seq),
    }
}

/// Versioned accession, falling back to the bare accession and then the locus name.
fn accession(seq: &Seq) -> String {
    [&seq.version, &seq.accession, &seq.name]
        .into_iter()
        .flatten()
        .filter_map(|v| v.split_whitespace().next())
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Residue count, or the LOCUS length for records that ship without sequence.
pub fn sequence_length(seq: &Seq) -> usize {
    if seq.seq.is_empty() {
        seq.len.unwrap_or(0)
    } else {
        seq.seq.len()
    }
}

/// DEFINITION folded onto one line, minus one trailing period.
fn description(seq: &Seq) -> String {
    let definition = seq
        .definition
        .as_deref()
        .unwrap_or("")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    match definition.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => definition,
    }
}
