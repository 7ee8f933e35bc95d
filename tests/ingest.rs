mod common;

use chrono::NaiveDate;
use common::xlsx_workbook;
use geotable::{
    config::PipelineConfig,
    data::{Value, midnight},
    error::IngestError,
    frame::ColumnType,
    ingest::{IngestConfig, load_table},
};

#[test]
fn tsv_extension_selects_tab_delimiter() {
    let table = load_table(
        b"species\theight\npine\t12\nspruce\t14\n",
        "trees.TSV",
        &IngestConfig::default(),
    )
    .unwrap();
    assert_eq!(table.column_names(), vec!["species", "height"]);
    assert_eq!(table.column("height").unwrap().kind(), ColumnType::Integer);
}

#[test]
fn configured_delimiter_overrides_extension() {
    let config = IngestConfig {
        delimiter: Some(';'),
        ..IngestConfig::default()
    };
    let table = load_table(b"a;b\n1;2\n", "semi.csv", &config).unwrap();
    assert_eq!(table.column_names(), vec!["a", "b"]);
}

#[test]
fn legacy_encodings_are_decoded() {
    let bytes = b"laji\nm\xe4nty\n";
    let config = IngestConfig {
        encoding: Some("latin1".into()),
        ..IngestConfig::default()
    };
    let table = load_table(bytes, "trees.csv", &config).unwrap();
    assert_eq!(
        table.column("laji").unwrap().get(0),
        Some(&Value::String("mänty".into()))
    );

    let err = load_table(bytes, "trees.csv", &IngestConfig::default()).unwrap_err();
    assert!(matches!(err, IngestError::Decode(_)));
}

#[test]
fn json_records_under_a_data_key() {
    let json = br#"{"data": [{"plot": 1, "note": null}, {"plot": 2, "note": "wet"}]}"#;
    let table = load_table(json, "export.json", &IngestConfig::default()).unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.column("note").unwrap().get(0), None);
    assert_eq!(table.column("plot").unwrap().get(1), Some(&Value::Integer(2)));
}

#[test]
fn malformed_inputs_are_errors() {
    let config = IngestConfig::default();
    assert!(matches!(
        load_table(br#"{"meta": {}}"#, "x.json", &config),
        Err(IngestError::UnsupportedJson)
    ));
    assert!(matches!(
        load_table(b"{not json", "x.geojson", &config),
        Err(IngestError::Json(_))
    ));
    assert!(load_table(b"definitely not a workbook", "x.xlsx", &config).is_err());
}

#[test]
fn geojson_features_without_positions_are_skipped() {
    let geojson = br#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": null, "properties": {"id": 1}},
            {"type": "Feature",
             "geometry": {"type": "LineString", "coordinates": [[24.0, 60.0], [26.0, 62.0]]},
             "properties": {"id": 2}}
        ]
    }"#;
    let table = geotable::load_and_clean(geojson, "lines.geojson", &PipelineConfig::default())
        .unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(
        table.column("longitude").unwrap().get(0),
        Some(&Value::Float(25.0))
    );
    assert_eq!(
        table.column("latitude").unwrap().get(0),
        Some(&Value::Float(61.0))
    );
}

const SHEET_STRINGS: &[&str] = &["plot", "measured", "height", "note", "NA", "wet", "other"];

const PLOTS_SHEET: &str = concat!(
    r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="s"><v>1</v></c>"#,
    r#"<c r="D1" t="s"><v>2</v></c><c r="E1" t="s"><v>3</v></c></row>"#,
    r#"<row r="2"><c r="A2"><v>1</v></c><c r="B2"><v>5</v></c><c r="C2" s="1"><v>44197</v></c>"#,
    r#"<c r="D2"><v>12.5</v></c><c r="E2" t="s"><v>4</v></c></row>"#,
    r#"<row r="3"><c r="A3"><v>2</v></c><c r="B3"><v>6</v></c><c r="C3" s="1"><v>44198</v></c>"#,
    r#"<c r="D3"><v>14.25</v></c><c r="E3" t="s"><v>5</v></c></row>"#,
);

const EXTRA_SHEET: &str =
    r#"<row r="1"><c r="A1" t="s"><v>6</v></c></row><row r="2"><c r="A2"><v>9</v></c></row>"#;

#[test]
fn excel_cells_are_typed_from_the_first_sheet() {
    let bytes = xlsx_workbook(SHEET_STRINGS, &[("Plots", PLOTS_SHEET), ("Extra", EXTRA_SHEET)]);
    let table = load_table(&bytes, "survey.xlsx", &IngestConfig::default()).unwrap();

    assert_eq!(
        table.column_names(),
        vec!["plot", "Unnamed_1", "measured", "height", "note"]
    );
    assert_eq!(table.row_count(), 2);

    let plot = table.column("plot").unwrap();
    assert_eq!(plot.kind(), ColumnType::Integer);
    assert_eq!(plot.get(1), Some(&Value::Integer(2)));
    assert_eq!(
        table.column("Unnamed_1").unwrap().get(0),
        Some(&Value::Integer(5))
    );

    let measured = table.column("measured").unwrap();
    assert_eq!(measured.kind(), ColumnType::DateTime);
    let new_year = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    assert_eq!(measured.get(0), Some(&Value::DateTime(midnight(new_year))));

    let height = table.column("height").unwrap();
    assert_eq!(height.kind(), ColumnType::Float);
    assert_eq!(height.get(0), Some(&Value::Float(12.5)));

    let note = table.column("note").unwrap();
    assert_eq!(note.get(0), None);
    assert_eq!(note.get(1), Some(&Value::String("wet".into())));
}

#[test]
fn excel_upload_survives_cleaning() {
    let bytes = xlsx_workbook(SHEET_STRINGS, &[("Plots", PLOTS_SHEET)]);
    let table = geotable::load_and_clean(&bytes, "survey.XLSX", &PipelineConfig::default())
        .unwrap();
    assert!(table.has_column("Unnamed_1"));
    assert!(!table.has_column("other"));
    assert_eq!(
        table.column("measured").unwrap().kind(),
        ColumnType::DateTime
    );
    assert_eq!(table.column("plot").unwrap().kind(), ColumnType::Integer);
}
