//! Reading product tables from delimited files.
//!
//! This is the ingestion side in its simplest form: every field becomes a
//! [`Cell`], numbers are recognised so JSON-style numeric cells survive, and
//! short or long rows are kept as-is so the engine can report them.
//!
//! - **Delimiter resolution**: `.tsv` → tab, anything else → comma, unless
//!   overridden.
//! - **Encoding**: inputs are decoded via `encoding_rs`, defaulting to UTF-8.
//! - **stdin**: the `-` path reads standard input.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::value::{Cell, format_number, parse_number};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(std::io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        )))
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Empty fields become [`Cell::Null`]. Numeric fields become
/// [`Cell::Number`] only when that keeps their text intact, so codes such as
/// `007` stay textual.
pub fn field_to_cell(field: String) -> Cell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Cell::Null;
    }
    match parse_number(trimmed) {
        Some(number) if format_number(number) == trimmed => Cell::Number(number),
        _ => Cell::Text(field),
    }
}

/// Header row plus every data row of a delimited file.
pub fn read_table(
    path: &Path,
    delimiter: Option<u8>,
    encoding: Option<&str>,
) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
    let delimiter = resolve_input_delimiter(path, delimiter);
    let encoding = resolve_encoding(encoding)?;
    let mut reader = open_csv_reader(open_input(path)?, delimiter);
    let headers = reader
        .byte_headers()
        .with_context(|| format!("Reading headers from {path:?}"))?
        .clone();
    let headers = decode_record(&headers, encoding)
        .with_context(|| format!("Decoding headers from {path:?}"))?
        .into_iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", row_idx + 1))?;
        let fields = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {} of {path:?}", row_idx + 1))?;
        rows.push(fields.into_iter().map(field_to_cell).collect());
    }
    Ok((headers, rows))
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) if !is_dash(p) => Ok(Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        ))),
        _ => Ok(Box::new(std::io::stdout())),
    }
}
