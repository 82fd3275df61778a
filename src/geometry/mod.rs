//! Point geometry handling for stored places.
//!
//! Places carry a single WGS84 point. Input may arrive in several textual or structured
//! forms (see [`GeometryInput`]); output is always canonical WKT via [`to_wkt`].

mod nearest;
mod validator;

use geo_types::Point;
use serde::Serializer;

pub use nearest::{find_nearest, Located};
pub use validator::{
    check_range, parse_geometry, validate, GeometryInput, ValidatedPoint, ValidationError,
};

/// Renders a point as canonical WKT, e.g. `POINT (10 20)`.
pub fn to_wkt(point: &Point<f64>) -> String {
    format!("POINT ({} {})", point.x(), point.y())
}

pub fn serialize_wkt<S>(point: &Point<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_wkt(point))
}

#[test]
fn wkt_drops_trailing_zeros() {
    assert_eq!(to_wkt(&Point::new(10.0, 20.0)), "POINT (10 20)");
    assert_eq!(to_wkt(&Point::new(2.5241, -6.4474)), "POINT (2.5241 -6.4474)");
    assert_eq!(to_wkt(&Point::new(-180.0, 90.0)), "POINT (-180 90)");
}
