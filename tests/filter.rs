mod common;

use common::{float_column, int_column, text_column};
use geotable::{
    filter::{self, FilterConfig, FilterSpec, Selection, apply_equality_filter, apply_temporal_filter},
    frame::Table,
};
use proptest::prelude::*;

fn plots() -> Table {
    Table::from_columns(vec![
        int_column("vuosi", &[Some(2009), Some(2010), Some(2011), Some(2010)]),
        text_column("species", &[Some("pine"), Some("spruce"), Some("pine"), None]),
        float_column("height", &[Some(10.0), Some(20.0), Some(30.0), Some(40.0)]),
        float_column("latitude", &[Some(61.0), Some(61.1), Some(61.2), Some(61.3)]),
        float_column("longitude", &[Some(24.0), Some(24.1), Some(24.2), Some(24.3)]),
        text_column("comment", &[Some("a"), Some("b"), Some("c"), Some("d")]),
    ])
}

proptest! {
    #[test]
    fn all_selection_is_identity(values in prop::collection::vec(prop::option::of("[a-c]"), 0..20)) {
        let refs = values.iter().map(|v| v.as_deref()).collect::<Vec<_>>();
        let table = Table::from_columns(vec![text_column("group", &refs)]);
        prop_assert_eq!(&apply_equality_filter(&table, "group", Some(&Selection::All)), &table);
        prop_assert_eq!(&apply_temporal_filter(&table, "group", &Selection::All), &table);
    }
}

#[test]
fn temporal_filter_keeps_only_selected_years() {
    let table = Table::from_columns(vec![int_column("year", &[Some(2009), Some(2010), Some(2011)])]);
    let filtered = apply_temporal_filter(&table, "year", &Selection::Only(vec![2010]));
    assert_eq!(filtered.row_count(), 1);
    assert_eq!(
        filtered.column("year").unwrap().get(0).and_then(|v| v.year()),
        Some(2010)
    );
}

#[test]
fn spec_from_raw_selectors() {
    let config = FilterConfig::default();
    let spec = FilterSpec::from_raw(
        &config,
        Some("species"),
        Some("__ALL__"),
        Some("vuosi"),
        &["2010", "later"],
    );
    let equality = spec.equality.unwrap();
    assert_eq!(equality.value, Some(Selection::All));
    let temporal = spec.temporal.unwrap();
    assert_eq!(temporal.periods, Selection::Only(vec![2010]));

    let empty = FilterSpec::from_raw::<&str>(&config, None, None, None, &[]);
    assert_eq!(empty, FilterSpec::default());
}

#[test]
fn apply_subsets_then_filters() {
    let config = FilterConfig::default();
    let spec = FilterSpec::from_raw(
        &config,
        Some("species"),
        Some("pine"),
        Some("vuosi"),
        &["2011"],
    );
    let filtered = filter::apply(&plots(), &["height"], &spec);
    assert_eq!(
        filtered.column_names(),
        vec!["vuosi", "species", "height", "latitude", "longitude"]
    );
    assert_eq!(filtered.row_count(), 1);
    assert_eq!(
        filtered.column("height").unwrap().get(0).and_then(|v| v.as_f64()),
        Some(30.0)
    );
}

#[test]
fn apply_with_no_filters_only_subsets() {
    let filtered = filter::apply(&plots(), &["comment", "missing"], &FilterSpec::default());
    assert_eq!(filtered.column_names(), vec!["latitude", "longitude", "comment"]);
    assert_eq!(filtered.row_count(), 4);
}
