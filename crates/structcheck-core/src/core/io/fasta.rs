use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Sequence data on line {line} precedes any '>' header")]
    MissingHeader { line: usize },
    #[error("Record '{header}' has an empty sequence")]
    EmptySequence { header: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub header: String,
    pub sequence: String,
}

impl FastaRecord {
    /// Identifier before the first `|` or whitespace (e.g. `1ABC_1`).
    pub fn id(&self) -> &str {
        self.header
            .split(|c: char| c == '|' || c.is_whitespace())
            .next()
            .unwrap_or("")
    }

    /// Chain identifiers named by an RCSB-style header field such as `Chains A, B[auth C]`.
    ///
    /// Author chain ids in `[auth X]` take precedence over label ids. Empty when the header
    /// names no chains.
    pub fn chains(&self) -> Vec<String> {
        let Some(field) = self.header.split('|').map(str::trim).find(|f| {
            f.starts_with("Chains ") || f.starts_with("Chain ")
        }) else {
            return Vec::new();
        };
        let list = field
            .trim_start_matches("Chains ")
            .trim_start_matches("Chain ");
        list.split(',')
            .filter_map(|item| {
                let item = item.trim();
                let chain = match (item.find("[auth "), item.rfind(']')) {
                    (Some(start), Some(end)) if end > start + 6 => item[start + 6..end].trim(),
                    _ => item,
                };
                (!chain.is_empty()).then(|| chain.to_string())
            })
            .collect()
    }
}

/// Parses multi-record FASTA text. Sequence lines are concatenated, upper-cased and stripped
/// of whitespace and terminal `*`.
pub fn parse(reader: &mut impl BufRead) -> Result<Vec<FastaRecord>, FastaError> {
    let mut records: Vec<FastaRecord> = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            records.push(FastaRecord {
                header: header.trim().to_string(),
                sequence: String::new(),
            });
            continue;
        }
        let record = records
            .last_mut()
            .ok_or(FastaError::MissingHeader { line: index + 1 })?;
        record.sequence.extend(
            line.chars()
                .filter(|c| !c.is_whitespace() && *c != '*')
                .map(|c| c.to_ascii_uppercase()),
        );
    }
    if let Some(empty) = records.iter().find(|r| r.sequence.is_empty()) {
        return Err(FastaError::EmptySequence {
            header: empty.header.clone(),
        });
    }
    Ok(records)
}

pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>, FastaError> {
    let mut reader = BufReader::new(File::open(path)?);
    parse(&mut reader)
}
