mod common;

use common::{SCHOOLS_CSV, TestWorkspace};
use school_locator::{
    LocatorError,
    data::Cell,
    export::{self, ExportOptions, Tabular},
    geo::{DistanceUnit, GeoPoint},
    proximity::{self, DISTANCE_COLUMN, SearchOptions},
};

fn south_bay() -> GeoPoint {
    GeoPoint::new(37.4, -122.1).unwrap()
}

fn names(result: &proximity::ProximityResult) -> Vec<String> {
    result
        .rows
        .iter()
        .map(|row| row.cells[0].as_display())
        .collect()
}

#[test]
fn results_are_ordered_nearest_first() {
    let ws = TestWorkspace::new();
    let (store, _) = ws.store_with(SCHOOLS_CSV);

    let result = proximity::find_nearby(&store, south_bay(), Some(50.0), &SearchOptions::default())
        .expect("search");

    assert_eq!(
        names(&result),
        vec!["Stanford Elementary", "San Jose Middle", "Millbrae Primary"]
    );
    let distances = result.rows.iter().map(|r| r.distance).collect::<Vec<_>>();
    assert!((4.2..4.35).contains(&distances[0]), "{distances:?}");
    assert!((12.7..12.9).contains(&distances[1]), "{distances:?}");
    assert!((21.5..21.75).contains(&distances[2]), "{distances:?}");
    for distance in distances {
        assert_eq!(distance, (distance * 100.0).round() / 100.0);
    }
    assert_eq!(result.skipped, 0);
}

#[test]
fn result_columns_end_with_distance() {
    let ws = TestWorkspace::new();
    let (store, _) = ws.store_with(SCHOOLS_CSV);

    let result = proximity::find_nearby(&store, south_bay(), Some(50.0), &SearchOptions::default())
        .unwrap();
    assert_eq!(
        result.columns,
        vec![
            "school_name",
            "location_city",
            "total_students",
            "latitude",
            "longitude",
            DISTANCE_COLUMN
        ]
    );
    let first = result.cell_rows().next().unwrap();
    assert_eq!(first.len(), result.columns.len());
    assert_eq!(first.last(), Some(&Cell::Real(result.rows[0].distance)));
}

#[test]
fn tiny_radius_matches_nothing() {
    let ws = TestWorkspace::new();
    let (store, _) = ws.store_with(SCHOOLS_CSV);

    let result = proximity::find_nearby(&store, south_bay(), Some(0.001), &SearchOptions::default())
        .unwrap();
    assert!(result.is_empty());
}

#[test]
fn radius_is_inclusive() {
    let ws = TestWorkspace::new();
    let (store, _) = ws.store_with(SCHOOLS_CSV);
    let center = GeoPoint::new(37.4275, -122.1697).unwrap();

    let result = proximity::find_nearby(&store, center, Some(0.0), &SearchOptions::default())
        .unwrap();
    assert_eq!(names(&result), vec!["Stanford Elementary"]);
    assert_eq!(result.rows[0].distance, 0.0);
}

#[test]
fn default_radius_is_ten() {
    let ws = TestWorkspace::new();
    let (store, _) = ws.store_with(SCHOOLS_CSV);

    let result =
        proximity::find_nearby(&store, south_bay(), None, &SearchOptions::default()).unwrap();
    assert_eq!(result.radius, proximity::DEFAULT_RADIUS);
    assert_eq!(names(&result), vec!["Stanford Elementary"]);
}

#[test]
fn kilometers_scale_distances() {
    let ws = TestWorkspace::new();
    let (store, _) = ws.store_with(SCHOOLS_CSV);
    let options = SearchOptions {
        unit: DistanceUnit::Kilometers,
        ..SearchOptions::default()
    };

    let result = proximity::find_nearby(&store, south_bay(), Some(10.0), &options).unwrap();
    assert_eq!(names(&result), vec!["Stanford Elementary"]);
    assert!((6.8..7.0).contains(&result.rows[0].distance));
}

#[test]
fn records_with_unusable_coordinates_are_skipped() {
    let ws = TestWorkspace::new();
    let csv = "\
name,latitude,longitude
Stanford Elementary,37.4275,-122.1697
Nowhere,unknown,-122.2
Offworld,137.0,-122.2
";
    let (store, _) = ws.store_with(csv);

    let result = proximity::find_nearby(&store, south_bay(), Some(50.0), &SearchOptions::default())
        .unwrap();
    assert_eq!(names(&result), vec!["Stanford Elementary"]);
    assert_eq!(result.skipped, 2);
}

#[test]
fn equal_distances_keep_dataset_order() {
    let ws = TestWorkspace::new();
    let csv = "\
name,latitude,longitude
first,37.5,-122.1
far,37.6,-122.1
second,37.5,-122.1
";
    let (store, _) = ws.store_with(csv);

    let result = proximity::find_nearby(&store, south_bay(), Some(50.0), &SearchOptions::default())
        .unwrap();
    assert_eq!(names(&result), vec!["first", "second", "far"]);
}

#[test]
fn projection_limits_columns() {
    let ws = TestWorkspace::new();
    let (store, _) = ws.store_with(SCHOOLS_CSV);
    let options = SearchOptions {
        projection: Some(vec!["school_name".into(), "location_city".into()]),
        ..SearchOptions::default()
    };

    let result = proximity::find_nearby(&store, south_bay(), Some(50.0), &options).unwrap();
    assert_eq!(result.columns, vec!["school_name", "location_city", DISTANCE_COLUMN]);
    assert_eq!(result.rows[0].cells.len(), 2);
}

#[test]
fn missing_coordinate_column_is_store_error() {
    let ws = TestWorkspace::new();
    let (store, _) = ws.store_with("name,lat,lon\nGunn,37.4,-122.1\n");

    let err = proximity::find_nearby(&store, south_bay(), Some(5.0), &SearchOptions::default())
        .unwrap_err();
    assert!(matches!(err, LocatorError::Store(_)), "{err}");
}

#[test]
fn negative_radius_is_rejected_before_scanning() {
    let ws = TestWorkspace::new();
    let (store, _) = ws.store_with(SCHOOLS_CSV);

    let err = proximity::find_nearby(&store, south_bay(), Some(-1.0), &SearchOptions::default())
        .unwrap_err();
    assert!(matches!(err, LocatorError::Range(_)), "{err}");
}

#[test]
fn repeated_searches_encode_identically() {
    let ws = TestWorkspace::new();
    let (store, _) = ws.store_with(SCHOOLS_CSV);
    let run = || {
        let result =
            proximity::find_nearby(&store, south_bay(), Some(50.0), &SearchOptions::default())
                .unwrap();
        export::encode(&result, ExportOptions::default()).unwrap()
    };

    assert_eq!(run(), run());
}

#[test]
fn rowid_named_column_does_not_reorder_ties() {
    let ws = TestWorkspace::new();
    let csv = "\
name,rowid,latitude,longitude
A,2,37.5,-122.0
B,1,37.5,-122.0
";
    let (store, _) = ws.store_with(csv);

    let result = proximity::find_nearby(&store, south_bay(), Some(50.0), &SearchOptions::default())
        .unwrap();
    assert_eq!(names(&result), vec!["A", "B"]);
}

#[test]
fn record_distance_column_survives_next_to_computed_one() {
    let ws = TestWorkspace::new();
    let csv = "\
name,distance,latitude,longitude
Stanford Elementary,999,37.4275,-122.1697
";
    let (store, _) = ws.store_with(csv);

    let result = proximity::find_nearby(&store, south_bay(), Some(50.0), &SearchOptions::default())
        .unwrap();
    assert_eq!(
        result.columns,
        vec!["name", "distance", "latitude", "longitude", "distance_mi"]
    );
    let records = result.to_json_records();
    let record = &records[0];
    assert_eq!(record["distance"], serde_json::json!(999));
    assert_eq!(record["distance_mi"], serde_json::json!(result.rows[0].distance));
    assert!(result.rows[0].distance < 5.0);
}
