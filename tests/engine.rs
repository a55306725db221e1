mod common;

use common::{SCHOOLS_CSV, TestWorkspace, fixture_path};
use school_locator::{
    LocatorError,
    address::AddressBook,
    config::EngineConfig,
    engine::Engine,
    geo::DistanceUnit,
    ingest::IngestOptions,
    store::Store,
};

fn engine_with_schools(ws: &TestWorkspace) -> Engine {
    let config = EngineConfig {
        database: ws.db_path(),
        ..EngineConfig::default()
    };
    let mut engine = Engine::open(config).expect("open engine");
    let source = ws.write("schools.csv", SCHOOLS_CSV);
    engine
        .ingest(&source, &IngestOptions::default())
        .expect("ingest schools");
    engine
}

#[test]
fn coordinates_are_validated_before_reading_the_store() {
    let engine = Engine::with_store(Store::in_memory().unwrap(), EngineConfig::default());

    let err = engine.find_nearby(91.0, 0.0, Some(5.0)).unwrap_err();
    assert!(matches!(err, LocatorError::Range(_)), "{err}");
    let err = engine.find_nearby_text("abc", "0", None).unwrap_err();
    assert!(matches!(err, LocatorError::Parse(_)), "{err}");
}

#[test]
fn missing_table_surfaces_as_store_error() {
    let engine = Engine::with_store(Store::in_memory().unwrap(), EngineConfig::default());

    let err = engine.find_nearby(37.4, -122.1, None).unwrap_err();
    assert!(matches!(err, LocatorError::Store(_)), "{err}");
}

#[test]
fn blank_radius_uses_configured_default() {
    let ws = TestWorkspace::new();
    let engine = engine_with_schools(&ws);

    let result = engine.find_nearby_text("37.4", "-122.1", Some("  ")).unwrap();
    assert_eq!(result.radius, engine.config().default_radius);
    assert_eq!(result.len(), 1);
}

#[test]
fn textual_radius_must_be_numeric() {
    let ws = TestWorkspace::new();
    let engine = engine_with_schools(&ws);

    let err = engine
        .find_nearby_text("37.4", "-122.1", Some("far"))
        .unwrap_err();
    assert!(matches!(err, LocatorError::Parse(_)), "{err}");
}

#[test]
fn read_only_engine_serves_searches_and_rejects_writes() {
    let ws = TestWorkspace::new();
    drop(engine_with_schools(&ws));

    let config = EngineConfig {
        database: ws.db_path(),
        read_only_queries: true,
        unit: DistanceUnit::Kilometers,
        ..EngineConfig::default()
    };
    let engine = Engine::open_read_only(config).expect("open read-only");

    let result = engine.find_nearby(37.4, -122.1, Some(30.0)).unwrap();
    assert_eq!(result.unit, DistanceUnit::Kilometers);
    assert_eq!(result.len(), 2);

    let err = engine.run_query("DROP TABLE school_data").unwrap_err();
    assert!(matches!(err, LocatorError::Query(_)), "{err}");
    assert_eq!(engine.run_query("SELECT * FROM school_data").unwrap().len(), 3);
}

#[test]
fn configured_projection_limits_nearby_columns() {
    let ws = TestWorkspace::new();
    drop(engine_with_schools(&ws));

    let config = EngineConfig {
        database: ws.db_path(),
        nearby_columns: Some(vec!["school_name".into()]),
        ..EngineConfig::default()
    };
    let engine = Engine::open(config).unwrap();

    let result = engine.find_nearby(37.4, -122.1, Some(50.0)).unwrap();
    assert_eq!(result.columns, vec!["school_name", "distance"]);
    let encoded = String::from_utf8(engine.encode(&result).unwrap()).unwrap();
    assert!(encoded.starts_with("school_name,distance\nStanford Elementary,"), "{encoded}");
}

#[test]
fn address_search_matches_coordinate_search() {
    let ws = TestWorkspace::new();
    let engine = engine_with_schools(&ws);
    let book = AddressBook::load(&fixture_path("addresses.csv")).expect("load addresses");

    let by_address = engine
        .find_nearby_address(&book, "450 serra mall", Some(50.0))
        .unwrap();
    let by_coordinates = engine.find_nearby(37.4275, -122.1697, Some(50.0)).unwrap();
    assert_eq!(by_address.rows, by_coordinates.rows);
    assert_eq!(by_address.rows[0].distance, 0.0);
}

#[test]
fn unknown_address_is_lookup_error() {
    let engine = Engine::with_store(Store::in_memory().unwrap(), EngineConfig::default());
    let book = AddressBook::load(&fixture_path("addresses.csv")).unwrap();

    let err = engine
        .find_nearby_address(&book, "10 Downing Street", None)
        .unwrap_err();
    assert!(matches!(err, LocatorError::Lookup(_)), "{err}");
}

#[test]
fn engine_ingest_keeps_configured_coordinate_gaps() {
    let ws = TestWorkspace::new();
    let config = EngineConfig {
        database: ws.db_path(),
        latitude_column: "lat".into(),
        longitude_column: "lon".into(),
        ..EngineConfig::default()
    };
    let mut engine = Engine::open(config).unwrap();
    let source = ws.write("schools.csv", "name,lat,lon\nGunn,,-122.1\nPaly,37.44,-122.15\n");
    engine.ingest(&source, &IngestOptions::default()).unwrap();

    let result = engine.find_nearby(37.44, -122.15, Some(5.0)).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.skipped, 1);
}

#[test]
fn open_existing_does_not_create_a_store() {
    let ws = TestWorkspace::new();
    let config = EngineConfig {
        database: ws.db_path(),
        ..EngineConfig::default()
    };

    assert!(matches!(Engine::open_existing(config), Err(LocatorError::Store(_))));
    assert!(!ws.db_path().exists());
}
