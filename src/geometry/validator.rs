use geo_types::{Geometry, Point};
use geozero::{geojson::GeoJson, wkt::WktStr, ToGeo};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::to_wkt;

const WGS84_SRID: &str = "4326";

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid geometry: {0}")]
    Malformed(String),
    #[error("invalid point geometry: got {0}")]
    WrongGeometryType(String),
    #[error("invalid coordinate range: ({x}, {y})")]
    OutOfRange { x: f64, y: f64 },
    #[error("this coordinate already exists")]
    Duplicate,
}

/// Geometry as submitted by a client.
///
/// Text may be WKT (`POINT (x y)`), EWKT with a WGS84 SRID prefix, or GeoJSON. Objects are
/// either `{"longitude": .., "latitude": ..}` or a GeoJSON geometry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeometryInput {
    Text(String),
    Coordinates { longitude: f64, latitude: f64 },
    GeoJson(serde_json::Value),
}

impl From<&str> for GeometryInput {
    fn from(text: &str) -> Self {
        Self::Text(text.into())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedPoint {
    /// The input as it was accepted, trimmed.
    pub raw: String,
    pub point: Point<f64>,
}

impl ValidatedPoint {
    pub fn x(&self) -> f64 {
        self.point.x()
    }

    pub fn y(&self) -> f64 {
        self.point.y()
    }
}

/// Checks that `input` is a single, non-empty, in-range point not already present in
/// `existing`. Equality against `existing` is exact on the decoded values.
pub fn validate(
    input: &GeometryInput,
    existing: &[Point<f64>],
) -> Result<ValidatedPoint, ValidationError> {
    let geometry = parse_geometry(input)?;

    if is_empty(&geometry) {
        return Err(ValidationError::Malformed("empty geometry".into()));
    }

    let point = match geometry {
        Geometry::Point(point) => point,
        other => {
            return Err(ValidationError::WrongGeometryType(
                geometry_type(&other).into(),
            ))
        }
    };

    check_range(&point)?;

    let (x, y) = point.x_y();
    if existing.iter().any(|p| p.x() == x && p.y() == y) {
        return Err(ValidationError::Duplicate);
    }

    Ok(ValidatedPoint {
        raw: raw_text(input),
        point,
    })
}

/// Inclusive WGS84 bounds: `|x| <= 180`, `|y| <= 90`.
pub fn check_range(point: &Point<f64>) -> Result<(), ValidationError> {
    let (x, y) = point.x_y();

    if !x.is_finite() || !y.is_finite() {
        return Err(ValidationError::Malformed("non-finite coordinate".into()));
    }

    if x.abs() > 180.0 || y.abs() > 90.0 {
        return Err(ValidationError::OutOfRange { x, y });
    }

    Ok(())
}

pub fn parse_geometry(input: &GeometryInput) -> Result<Geometry<f64>, ValidationError> {
    match input {
        GeometryInput::Text(raw) => parse_text(raw),
        GeometryInput::Coordinates {
            longitude,
            latitude,
        } => Ok(Point::new(*longitude, *latitude).into()),
        GeometryInput::GeoJson(value) => parse_geojson_value(value),
    }
}

fn parse_text(raw: &str) -> Result<Geometry<f64>, ValidationError> {
    let text = raw.trim();

    if text.is_empty() {
        return Err(ValidationError::Malformed("empty input".into()));
    }

    if text.starts_with('{') {
        return parse_geojson(text);
    }

    let wkt = strip_srid(text)?;

    // the WKT reader has no representation for empty points
    if wkt.to_ascii_uppercase().ends_with("EMPTY") {
        return Err(ValidationError::Malformed("empty geometry".into()));
    }

    check_trailing_text(wkt)?;

    WktStr(wkt)
        .to_geo()
        .map_err(|err| ValidationError::Malformed(err.to_string()))
}

/// The WKT reader stops after the first geometry, so anything past its closing
/// parenthesis has to be rejected here.
fn check_trailing_text(wkt: &str) -> Result<(), ValidationError> {
    let mut depth = 0usize;

    for (idx, ch) in wkt.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' if depth == 0 => {
                return Err(ValidationError::Malformed("unbalanced parentheses".into()))
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let rest = wkt[idx + 1..].trim();
                    if !rest.is_empty() {
                        return Err(ValidationError::Malformed(format!(
                            "unexpected text after geometry: {}",
                            rest
                        )));
                    }
                    return Ok(());
                }
            }
            _ => {}
        }
    }

    // unclosed input is left for the WKT reader to report
    Ok(())
}

fn parse_geojson(text: &str) -> Result<Geometry<f64>, ValidationError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|err| ValidationError::Malformed(err.to_string()))?;

    parse_geojson_value(&value)
}

/// Only bare GeoJSON geometries are accepted. The reader would otherwise unwrap the
/// geometry of a Feature.
fn parse_geojson_value(value: &serde_json::Value) -> Result<Geometry<f64>, ValidationError> {
    match value.get("type").and_then(|kind| kind.as_str()) {
        Some("Feature") | Some("FeatureCollection") => {
            return Err(ValidationError::Malformed(
                "GeoJSON features are not geometries".into(),
            ))
        }
        Some(_) => {}
        None => return Err(ValidationError::Malformed("GeoJSON type is missing".into())),
    }

    GeoJson(&value.to_string())
        .to_geo()
        .map_err(|err| ValidationError::Malformed(err.to_string()))
}

/// Strips an EWKT `SRID=4326;` prefix. Any other SRID is rejected.
fn strip_srid(text: &str) -> Result<&str, ValidationError> {
    let (prefix, rest) = match text.split_once(';') {
        Some(parts) => parts,
        None => return Ok(text),
    };

    let prefix = prefix.trim();
    let is_srid = prefix
        .get(..5)
        .map_or(false, |tag| tag.eq_ignore_ascii_case("SRID="));

    if !is_srid {
        return Err(ValidationError::Malformed(format!(
            "unexpected prefix {:?}",
            prefix
        )));
    }

    let srid = prefix[5..].trim();
    if srid != WGS84_SRID {
        return Err(ValidationError::Malformed(format!(
            "unsupported SRID {}",
            srid
        )));
    }

    Ok(rest.trim())
}

fn raw_text(input: &GeometryInput) -> String {
    match input {
        GeometryInput::Text(raw) => raw.trim().into(),
        GeometryInput::Coordinates {
            longitude,
            latitude,
        } => to_wkt(&Point::new(*longitude, *latitude)),
        GeometryInput::GeoJson(value) => value.to_string(),
    }
}

fn is_empty(geometry: &Geometry<f64>) -> bool {
    match geometry {
        Geometry::Point(_) | Geometry::Line(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
            false
        }
        Geometry::LineString(line_string) => line_string.0.is_empty(),
        Geometry::Polygon(polygon) => polygon.exterior().0.is_empty(),
        Geometry::MultiPoint(multi_point) => multi_point.0.is_empty(),
        Geometry::MultiLineString(multi_line_string) => multi_line_string.0.is_empty(),
        Geometry::MultiPolygon(multi_polygon) => multi_polygon.0.is_empty(),
        Geometry::GeometryCollection(collection) => collection.0.is_empty(),
    }
}

fn geometry_type(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) | Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
    }
}

#[test]
fn valid_point_keeps_parsed_values() {
    let validated = validate(&"POINT (10 20)".into(), &[]).unwrap();

    assert_eq!(validated.x(), 10.0);
    assert_eq!(validated.y(), 20.0);
    assert_eq!(validated.raw, "POINT (10 20)");

    let validated = validate(&"  POINT (2.5241 -6.4474) ".into(), &[]).unwrap();
    assert_eq!(validated.point, Point::new(2.5241, -6.4474));
    assert_eq!(validated.raw, "POINT (2.5241 -6.4474)");
}

#[test]
fn polygon_is_wrong_geometry_type() {
    let result = validate(&"POLYGON ((0 0, 1 1, 2 2, 0 0))".into(), &[]);
    assert_eq!(
        result,
        Err(ValidationError::WrongGeometryType("Polygon".into()))
    );

    let result = validate(&"LINESTRING (0 0, 1 1)".into(), &[]);
    assert_eq!(
        result,
        Err(ValidationError::WrongGeometryType("LineString".into()))
    );
}

#[test]
fn out_of_range_coordinates_are_rejected() {
    for wkt in [
        "POINT (200 50)",
        "POINT (-200 50)",
        "POINT (10 90.5)",
        "POINT (10 -91)",
    ] {
        let result = validate(&wkt.into(), &[]);
        assert!(
            matches!(result, Err(ValidationError::OutOfRange { .. })),
            "{} should be out of range",
            wkt
        );
    }
}

#[test]
fn bounds_are_inclusive() {
    for wkt in [
        "POINT (180 0)",
        "POINT (-180 0)",
        "POINT (0 90)",
        "POINT (0 -90)",
        "POINT (180 -90)",
    ] {
        assert!(validate(&wkt.into(), &[]).is_ok(), "{} should be valid", wkt);
    }
}

#[test]
fn duplicates_compare_decoded_values() {
    let existing = vec![Point::new(10.0, 20.0), Point::new(30.0, 40.0)];

    assert_eq!(
        validate(&"POINT (10 20)".into(), &existing),
        Err(ValidationError::Duplicate)
    );
    assert_eq!(
        validate(&"POINT(10    20)".into(), &existing),
        Err(ValidationError::Duplicate)
    );
    assert_eq!(
        validate(&"POINT (30.000 40.0)".into(), &existing),
        Err(ValidationError::Duplicate)
    );

    let coordinates = GeometryInput::Coordinates {
        longitude: 10.0,
        latitude: 20.0,
    };
    assert_eq!(
        validate(&coordinates, &existing),
        Err(ValidationError::Duplicate)
    );

    // no tolerance
    assert!(validate(&"POINT (10.000001 20)".into(), &existing).is_ok());
}

#[test]
fn garbage_is_malformed() {
    for raw in [
        "",
        "   ",
        "hello",
        "POINT (10)",
        "POINT (a b)",
        "POINT (1 2) junk",
        "POINT (1 2) POINT (3 4)",
        "POINT (1 2))",
        "SRID=4326;POINT (1 2) junk",
    ] {
        let result = validate(&raw.into(), &[]);
        assert!(
            matches!(result, Err(ValidationError::Malformed(_))),
            "{:?} should be malformed",
            raw
        );
    }
}

#[test]
fn empty_geometry_is_malformed() {
    assert!(matches!(
        validate(&"POINT EMPTY".into(), &[]),
        Err(ValidationError::Malformed(_))
    ));
    assert!(matches!(
        validate(&"GEOMETRYCOLLECTION EMPTY".into(), &[]),
        Err(ValidationError::Malformed(_))
    ));
}

#[test]
fn ewkt_accepts_only_wgs84() {
    let validated = validate(&"SRID=4326;POINT (10 20)".into(), &[]).unwrap();
    assert_eq!(validated.point, Point::new(10.0, 20.0));

    assert!(matches!(
        validate(&"SRID=3857;POINT (10 20)".into(), &[]),
        Err(ValidationError::Malformed(_))
    ));
    assert!(matches!(
        validate(&"FOO;POINT (10 20)".into(), &[]),
        Err(ValidationError::Malformed(_))
    ));
}

#[test]
fn structured_inputs_are_accepted() {
    let coordinates = GeometryInput::Coordinates {
        longitude: -73.9857,
        latitude: 40.7484,
    };
    let validated = validate(&coordinates, &[]).unwrap();
    assert_eq!(validated.point, Point::new(-73.9857, 40.7484));
    assert_eq!(validated.raw, "POINT (-73.9857 40.7484)");

    let coordinates = GeometryInput::Coordinates {
        longitude: 181.0,
        latitude: 0.0,
    };
    assert!(matches!(
        validate(&coordinates, &[]),
        Err(ValidationError::OutOfRange { .. })
    ));
}

#[test]
fn geojson_points_are_validated() {
    use serde_json::json;

    let text: GeometryInput = r#"{"type": "Point", "coordinates": [10.5, 20.25]}"#.into();
    let validated = validate(&text, &[]).unwrap();
    assert_eq!(validated.point, Point::new(10.5, 20.25));

    let object = GeometryInput::GeoJson(json!({
        "type": "Point",
        "coordinates": [-73.9857, 40.7484]
    }));
    let validated = validate(&object, &[]).unwrap();
    assert_eq!(validated.point, Point::new(-73.9857, 40.7484));

    let polygon = GeometryInput::GeoJson(json!({
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [0.0, 0.0]]]
    }));
    assert_eq!(
        validate(&polygon, &[]),
        Err(ValidationError::WrongGeometryType("Polygon".into()))
    );

    let far = GeometryInput::GeoJson(json!({"type": "Point", "coordinates": [200.0, 10.0]}));
    assert!(matches!(
        validate(&far, &[]),
        Err(ValidationError::OutOfRange { .. })
    ));

    let existing = vec![Point::new(30.0, 40.0)];
    let repeated: GeometryInput = r#"{"type": "Point", "coordinates": [30, 40]}"#.into();
    assert_eq!(
        validate(&repeated, &existing),
        Err(ValidationError::Duplicate)
    );
}

#[test]
fn geojson_features_are_malformed() {
    use serde_json::json;

    let feature = json!({
        "type": "Feature",
        "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
        "properties": {}
    });
    let collection = json!({"type": "FeatureCollection", "features": [feature.clone()]});

    for value in [feature, collection] {
        let as_text: GeometryInput = value.to_string().as_str().into();
        assert!(matches!(
            validate(&as_text, &[]),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            validate(&GeometryInput::GeoJson(value), &[]),
            Err(ValidationError::Malformed(_))
        ));
    }

    let untyped: GeometryInput = r#"{"coordinates": [1, 2]}"#.into();
    assert!(matches!(
        validate(&untyped, &[]),
        Err(ValidationError::Malformed(_))
    ));
}

#[test]
fn only_two_dimensional_wkt_is_accepted() {
    // hex WKB and Z/M coordinates are not read; stored places are 2D WGS84 points
    for raw in [
        "POINT Z (1 2 3)",
        "0101000000000000000000F03F0000000000000040",
        "SRID=4326;0101000000000000000000F03F0000000000000040",
    ] {
        assert!(
            matches!(validate(&raw.into(), &[]), Err(ValidationError::Malformed(_))),
            "{:?} should be malformed",
            raw
        );
    }
}

#[test]
fn input_deserializes_from_text_and_objects() {
    let input: GeometryInput = serde_json::from_str(r#""POINT (1 2)""#).unwrap();
    assert!(matches!(input, GeometryInput::Text(_)));

    let input: GeometryInput =
        serde_json::from_str(r#"{"longitude": 1.5, "latitude": 2.5}"#).unwrap();
    assert!(matches!(
        input,
        GeometryInput::Coordinates {
            longitude,
            latitude
        } if longitude == 1.5 && latitude == 2.5
    ));

    let input: GeometryInput =
        serde_json::from_str(r#"{"type": "Point", "coordinates": [1.5, 2.5]}"#).unwrap();
    assert!(matches!(input, GeometryInput::GeoJson(_)));
}

#[test]
fn empty_collections_are_detected() {
    use geo_types::{GeometryCollection, LineString, MultiPoint};

    assert!(is_empty(&Geometry::GeometryCollection(
        GeometryCollection::<f64>(vec![])
    )));
    assert!(is_empty(&Geometry::MultiPoint(MultiPoint::<f64>(vec![]))));
    assert!(is_empty(&Geometry::LineString(LineString::<f64>(vec![]))));
    assert!(!is_empty(&Geometry::Point(Point::new(0.0, 0.0))));
}

#[test]
fn query_range_check_rejects_non_finite() {
    assert!(check_range(&Point::new(2.5241, 6.4474)).is_ok());
    assert!(matches!(
        check_range(&Point::new(f64::NAN, 0.0)),
        Err(ValidationError::Malformed(_))
    ));
    assert!(matches!(
        check_range(&Point::new(0.0, 95.0)),
        Err(ValidationError::OutOfRange { .. })
    ));
}
