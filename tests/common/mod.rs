#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use geotable::{
    config::PipelineConfig,
    data::Value,
    frame::{Column, ColumnType, Table},
};
use tempfile::{TempDir, tempdir};
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

/// Runs ingest and preprocessing with the default policy.
pub fn clean(contents: &str, filename: &str) -> Table {
    geotable::load_and_clean(contents.as_bytes(), filename, &PipelineConfig::default())
        .expect("load and clean")
}

pub fn text_column(name: &str, values: &[Option<&str>]) -> Column {
    Column::with_type(
        name,
        ColumnType::String,
        values
            .iter()
            .map(|v| v.map(|s| Value::String(s.to_string())))
            .collect(),
    )
}

pub fn int_column(name: &str, values: &[Option<i64>]) -> Column {
    Column::with_type(
        name,
        ColumnType::Integer,
        values.iter().map(|v| v.map(Value::Integer)).collect(),
    )
}

pub fn float_column(name: &str, values: &[Option<f64>]) -> Column {
    Column::with_type(
        name,
        ColumnType::Float,
        values.iter().map(|v| v.map(Value::Float)).collect(),
    )
}

pub fn float_at(table: &Table, column: &str, row: usize) -> Option<f64> {
    table
        .column(column)
        .and_then(|c| c.get(row))
        .and_then(Value::as_f64)
}

/// Builds a minimal `.xlsx` package in memory. Each sheet is a name plus the
/// `<row>` elements of its `sheetData`; `t="s"` cells index into `strings`.
/// Cells with style `s="1"` carry a built-in date format.
pub fn xlsx_workbook(strings: &[&str], sheets: &[(&str, &str)]) -> Vec<u8> {
    let sheet_entries = sheets
        .iter()
        .enumerate()
        .map(|(idx, (name, _))| {
            format!(r#"<sheet name="{name}" sheetId="{id}" r:id="rId{id}"/>"#, id = idx + 1)
        })
        .collect::<String>();
    let relationships = sheets
        .iter()
        .enumerate()
        .map(|(idx, _)| {
            format!(
                r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#,
                id = idx + 1
            )
        })
        .collect::<String>();
    let shared = strings
        .iter()
        .map(|s| format!("<si><t>{s}</t></si>"))
        .collect::<String>();

    let mut parts = vec![
        (
            "xl/workbook.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheet_entries}</sheets></workbook>"#
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#
            ),
        ),
        (
            "xl/sharedStrings.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{n}" uniqueCount="{n}">{shared}</sst>"#,
                n = strings.len()
            ),
        ),
        (
            "xl/styles.xml".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14"/></cellXfs></styleSheet>"#
                .to_string(),
        ),
    ];
    for (idx, (_, rows)) in sheets.iter().enumerate() {
        parts.push((
            format!("xl/worksheets/sheet{}.xml", idx + 1),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{rows}</sheetData></worksheet>"#
            ),
        ));
    }

    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        let options: FileOptions<'_, ()> =
            FileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, contents) in parts {
            zip.start_file(name, options).expect("start zip entry");
            zip.write_all(contents.as_bytes()).expect("write zip entry");
        }
        zip.finish().expect("finish workbook");
    }
    buf
}
