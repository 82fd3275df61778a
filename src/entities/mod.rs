mod place;

pub use place::{validate_name, Place, PlaceParams, PlaceRecord, NAME_MAX_LENGTH};
