use proptest::prelude::*;
use school_locator::{
    LocatorError,
    geo::{self, DistanceUnit, GeoPoint},
};

fn point() -> impl Strategy<Value = GeoPoint> {
    (-90.0f64..=90.0, -180.0f64..=180.0)
        .prop_map(|(lat, lon)| GeoPoint::new(lat, lon).expect("generated point in range"))
}

proptest! {
    #[test]
    fn distance_is_non_negative_and_finite(a in point(), b in point()) {
        let d = geo::distance(a, b, DistanceUnit::Miles);
        prop_assert!(d.is_finite());
        prop_assert!(d >= 0.0);
        prop_assert!(d <= std::f64::consts::PI * geo::EARTH_RADIUS_MI + 1e-6);
    }

    #[test]
    fn distance_to_self_is_zero(a in point()) {
        prop_assert_eq!(geo::distance(a, a, DistanceUnit::Kilometers), 0.0);
    }

    #[test]
    fn distance_is_symmetric(a in point(), b in point()) {
        let forward = geo::distance(a, b, DistanceUnit::Kilometers);
        let backward = geo::distance(b, a, DistanceUnit::Kilometers);
        prop_assert!((forward - backward).abs() < 1e-9);
    }

    #[test]
    fn in_range_coordinates_validate(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
        prop_assert!(geo::validate(lat, lon).is_ok());
    }
}

#[test]
fn validator_rejects_each_bound() {
    for (lat, lon) in [(91.0, 0.0), (-91.0, 0.0), (0.0, 181.0), (0.0, -181.0)] {
        let err = geo::validate(lat, lon).unwrap_err();
        assert!(matches!(err, LocatorError::Range(_)), "({lat}, {lon}): {err}");
    }
}

#[test]
fn validator_accepts_extremes() {
    assert!(geo::validate(90.0, 180.0).is_ok());
    assert!(geo::validate(-90.0, -180.0).is_ok());
}

#[test]
fn non_finite_coordinates_are_parse_errors() {
    let err = geo::validate(f64::NAN, 0.0).unwrap_err();
    assert!(matches!(err, LocatorError::Parse(_)));
    let err = geo::validate(0.0, f64::INFINITY).unwrap_err();
    assert!(matches!(err, LocatorError::Parse(_)));
}

#[test]
fn textual_coordinates_are_trimmed() {
    let point = GeoPoint::parse(" 37.4 ", "-122.1\n").unwrap();
    assert_eq!(point.latitude(), 37.4);
    assert_eq!(point.longitude(), -122.1);
    assert!(matches!(
        GeoPoint::parse("", "0"),
        Err(LocatorError::Parse(_))
    ));
}

#[test]
fn miles_and_kilometers_agree() {
    let a = GeoPoint::new(37.4, -122.1).unwrap();
    let b = GeoPoint::new(37.3352, -121.8811).unwrap();
    let miles = geo::distance(a, b, DistanceUnit::Miles);
    let km = geo::distance(a, b, DistanceUnit::Kilometers);
    assert!((km / miles - geo::EARTH_RADIUS_KM / geo::EARTH_RADIUS_MI).abs() < 1e-12);
}
