use geo_types::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::geometry::{serialize_wkt, GeometryInput, Located};

pub const NAME_MAX_LENGTH: usize = 250;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Place {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(serialize_with = "serialize_wkt")]
    pub geom: Point<f64>,
}

impl Located for Place {
    fn location(&self) -> Point<f64> {
        self.geom
    }
}

/// The stored fields of a place, without the identifier the store assigns.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceRecord {
    pub name: String,
    pub description: String,
    pub geom: Point<f64>,
}

impl PlaceRecord {
    pub fn into_place(self, id: Uuid) -> Place {
        Place {
            id,
            name: self.name,
            description: self.description,
            geom: self.geom,
        }
    }
}

impl From<Place> for PlaceRecord {
    fn from(place: Place) -> Self {
        Self {
            name: place.name,
            description: place.description,
            geom: place.geom,
        }
    }
}

/// Client-supplied fields for create and update. Every field is optional here; which ones
/// are required depends on the operation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlaceParams {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "coordinate")]
    pub geom: Option<GeometryInput>,
}

/// Trims `name` and checks it is non-blank and at most [`NAME_MAX_LENGTH`] characters.
pub fn validate_name(name: &str) -> Result<String, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::invalid_field_error("name", "this field may not be blank"));
    }

    if name.chars().count() > NAME_MAX_LENGTH {
        return Err(Error::invalid_field_error(
            "name",
            "ensure this field has no more than 250 characters",
        ));
    }

    Ok(name.into())
}

#[test]
fn place_serializes_geom_as_wkt() {
    let place = Place {
        id: Uuid::nil(),
        name: "Test Place".into(),
        description: "This is a test place".into(),
        geom: Point::new(10.0, 20.0),
    };

    let value = serde_json::to_value(&place).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "id": "00000000-0000-0000-0000-000000000000",
            "name": "Test Place",
            "description": "This is a test place",
            "geom": "POINT (10 20)",
        })
    );
}

#[test]
fn names_are_trimmed_and_bounded() {
    assert_eq!(validate_name("  Harbour ").unwrap(), "Harbour");
    assert_eq!(validate_name("").unwrap_err().code, 105);
    assert_eq!(validate_name("   ").unwrap_err().code, 105);
    assert!(validate_name(&"a".repeat(250)).is_ok());
    assert!(validate_name(&"a".repeat(251)).is_err());
}

#[test]
fn params_accept_coordinate_alias() {
    let params: PlaceParams =
        serde_json::from_str(r#"{"name": "x", "coordinate": "POINT (1 2)"}"#).unwrap();
    assert!(matches!(params.geom, Some(GeometryInput::Text(_))));
    assert!(params.description.is_none());
}
