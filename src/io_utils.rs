//! Byte-level helpers for the ingest boundary.
//!
//! Uploads arrive as raw bytes plus a filename. This module resolves the text
//! encoding and CSV delimiter for them and builds the `csv` reader used by the
//! CSV loader:
//!
//! - **Delimiter resolution**: extension-based (`.tsv` → tab, anything else →
//!   comma) with manual override support.
//! - **Encoding**: decoding via `encoding_rs`, defaulting to UTF-8 with the
//!   byte-order mark stripped.

use std::io::Read;

use encoding_rs::{Encoding, UTF_8};

use crate::error::IngestError;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding, IngestError> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| IngestError::UnknownEncoding(value.to_string()))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(filename: &str, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match extension(filename) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn extension(filename: &str) -> Option<&str> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.contains(['/', '\\']) {
        None
    } else {
        Some(ext)
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8, has_headers: bool) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

/// Decodes a whole upload, dropping a leading byte-order mark.
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String, IngestError> {
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        Err(IngestError::Decode(encoding.name()))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::StringRecord) -> Vec<String> {
    record.iter().map(str::to_string).collect()
}
