use anyhow::{bail, Context, Result};
use csv::{Reader, StringRecord, Writer};
use near_dedup_service::dto::{DedupOutput, Record};
use near_dedup_service::error::{DedupError, ErrorKind};
use serde::Serialize;
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// Bodies the crawler stores for posts that no longer exist.
const REMOVED_MARKERS: [&str; 2] = ["[deleted]", "[removed]"];

#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Falls back to an `id` column if present, else to the row number.
    pub id_column: Option<String>,
    pub text_columns: Vec<String>,
    pub criterion_column: String,
    pub strip_edits: bool,
}

/// A row that never reached, or was skipped by, the deduplicator.
#[derive(Clone, Debug, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub id: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Loaded rows, kept alongside the records built from them.
#[derive(Debug)]
pub struct Corpus {
    pub headers: StringRecord,
    /// `rows[i]` is the source of `records[i]`.
    pub rows: Vec<StringRecord>,
    pub records: Vec<Record>,
    /// Data row number (0-based, header excluded) of each record.
    pub row_numbers: Vec<usize>,
    pub rejected: Vec<SkippedRow>,
    pub removed: usize,
}

impl Corpus {
    /// Loader rejections followed by the records the deduplicator skipped.
    pub fn skipped_rows(&self, output: &DedupOutput) -> Vec<SkippedRow> {
        let mut rows = self.rejected.clone();
        rows.extend(output.skipped.iter().map(|s| SkippedRow {
            row: self.row_numbers[s.index],
            id: s.id.clone(),
            kind: s.error.kind,
            message: s.error.msg.clone(),
        }));
        rows
    }
}

/// Cuts `text` at the first case-insensitive "edit", as in "Edit: thanks for the gold".
pub fn strip_edit(text: &str) -> &str {
    match text.to_ascii_lowercase().find("edit") {
        Some(at) => &text[..at],
        None => text,
    }
}

pub fn read_data_file(path: &Path, options: &LoadOptions) -> Result<Corpus> {
    let reader = Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    read_data(reader, options)
}

pub fn read_data<R: io::Read>(mut reader: Reader<R>, options: &LoadOptions) -> Result<Corpus> {
    let headers = reader.headers().context("reading CSV headers")?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    if options.text_columns.is_empty() {
        bail!("at least one text column is required");
    }
    let text_idx: Vec<usize> = options
        .text_columns
        .iter()
        .map(|name| column(name.as_str()))
        .collect::<Option<_>>()
        .ok_or_else(|| {
            DedupError::invalid_record(format!(
                "file must contain columns {}",
                options.text_columns.join(", ")
            ))
        })?;
    let id_idx = match &options.id_column {
        Some(name) => Some(column(name.as_str()).ok_or_else(|| {
            DedupError::invalid_record(format!("file must contain column '{name}'"))
        })?),
        None => column("id"),
    };
    let criterion_idx = column(options.criterion_column.as_str());
    if criterion_idx.is_none() {
        warn!(
            column = %options.criterion_column,
            "Criterion column not found, every record scores 0"
        );
    }

    let mut corpus = Corpus {
        headers: headers.clone(),
        rows: Vec::new(),
        records: Vec::new(),
        row_numbers: Vec::new(),
        rejected: Vec::new(),
        removed: 0,
    };
    for (row, result) in reader.records().enumerate() {
        let rec = match result {
            Ok(rec) => rec,
            Err(err) => {
                warn!(row, error = %err, "Rejecting unreadable row");
                corpus.rejected.push(SkippedRow {
                    row,
                    id: row.to_string(),
                    kind: ErrorKind::InvalidRecord,
                    message: err.to_string(),
                });
                continue;
            }
        };
        let id = id_idx
            .and_then(|i| rec.get(i))
            .map_or_else(|| row.to_string(), str::to_string);
        let fields: Vec<&str> = text_idx.iter().map(|&i| rec.get(i).unwrap_or("")).collect();
        // the body is the last text column
        let body = fields.last().map_or("", |f| f.trim());
        if REMOVED_MARKERS.contains(&body) {
            corpus.removed += 1;
            continue;
        }
        let criterion = match criterion_idx.and_then(|i| rec.get(i)) {
            None => 0.0,
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(value) => value,
                Err(_) => {
                    corpus.rejected.push(SkippedRow {
                        row,
                        id,
                        kind: ErrorKind::InvalidRecord,
                        message: format!(
                            "{} value '{raw}' is not a number",
                            options.criterion_column
                        ),
                    });
                    continue;
                }
            },
        };
        let text = fields
            .iter()
            .map(|&f| if options.strip_edits { strip_edit(f) } else { f })
            .collect::<Vec<&str>>()
            .join(" ");
        corpus.records.push(Record { id, text, criterion });
        corpus.row_numbers.push(row);
        corpus.rows.push(rec);
    }
    info!(
        records = corpus.records.len(),
        rejected = corpus.rejected.len(),
        removed = corpus.removed,
        "Loaded records"
    );
    Ok(corpus)
}

pub fn write_result_file(path: &Path, corpus: &Corpus, output: &DedupOutput) -> Result<()> {
    let writer = Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    write_results(writer, corpus, output)
}

/// Writes each representative's source row plus its `reposts` count.
pub fn write_results<W: io::Write>(
    mut writer: Writer<W>,
    corpus: &Corpus,
    output: &DedupOutput,
) -> Result<()> {
    let mut header = corpus.headers.clone();
    header.push_field("reposts");
    writer.write_record(&header)?;
    for result in &output.results {
        let mut row = corpus.rows[result.representative_index].clone();
        row.push_field(&result.duplicate_count.to_string());
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
